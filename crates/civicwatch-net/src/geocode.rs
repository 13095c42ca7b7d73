//! Reverse geocoding (point to human-readable address).

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tracing::debug;

use civicwatch_shared::Coordinates;

use crate::error::{NetError, Result};

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, point: Coordinates) -> Result<String>;
}

/// Google Geocoding API (`?latlng=LAT,LNG&key=KEY`).
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    async fn reverse_geocode(&self, point: Coordinates) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(NetError::NotConfigured("reverse geocode API key"));
        }

        let latlng = format!("{},{}", point.lat, point.lng);
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| NetError::Decode(format!("geocode body: {e}")))?;

        let address = first_formatted_address(&body).map_err(|e| NetError::Decode(format!("{e:#}")))?;
        debug!(lat = point.lat, lng = point.lng, "Reverse geocode resolved");
        Ok(address)
    }
}

fn first_formatted_address(body: &serde_json::Value) -> anyhow::Result<String> {
    let results = body
        .get("results")
        .and_then(|r| r.as_array())
        .context("missing results array")?;

    let Some(first) = results.first() else {
        let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("UNKNOWN");
        bail!("no address for point (status {status})");
    };

    let address = first
        .get("formatted_address")
        .and_then(|a| a.as_str())
        .context("first result has no formatted_address")?;

    if address.trim().is_empty() {
        bail!("empty formatted_address");
    }
    Ok(address.to_string())
}
