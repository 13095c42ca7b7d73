//! Place search (free text to candidate points).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use civicwatch_shared::protocol::lenient_f64;
use civicwatch_shared::{Coordinates, Suggestion};

use crate::error::{NetError, Result};

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Best-effort text search. Rate-sensitive: callers must debounce.
    async fn search(&self, text: &str) -> Result<Vec<Suggestion>>;
}

/// Nominatim-compatible search endpoint (`/search?format=json&q=...`).
#[derive(Debug, Clone)]
pub struct NominatimSearch {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

/// One search hit. Every field is optional so a single malformed entry
/// is dropped on its own instead of failing the batch.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    lon: Option<f64>,
}

impl NominatimSearch {
    pub fn new(base_url: impl Into<String>, limit: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("civicwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            limit,
        })
    }
}

#[async_trait]
impl PlaceSearch for NominatimSearch {
    async fn search(&self, text: &str) -> Result<Vec<Suggestion>> {
        let limit = self.limit.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("format", "json"), ("q", text), ("limit", limit.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Status(resp.status().as_u16()));
        }

        let places: Vec<NominatimPlace> = resp
            .json()
            .await
            .map_err(|e| NetError::Decode(format!("place search body: {e}")))?;

        let suggestions: Vec<Suggestion> = places
            .into_iter()
            .filter_map(to_suggestion)
            .take(self.limit)
            .collect();

        debug!(query = %text, results = suggestions.len(), "Place search completed");
        Ok(suggestions)
    }
}

/// Entries whose coordinates do not parse are skipped rather than failing the batch.
fn to_suggestion(place: NominatimPlace) -> Option<Suggestion> {
    let label = place.display_name.filter(|l| !l.trim().is_empty())?;
    let point = Coordinates::checked(place.lat?, place.lon?)?;
    Some(Suggestion {
        label,
        lat: point.lat,
        lng: point.lng,
    })
}
