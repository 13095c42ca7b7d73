use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::constants::COORD_LABEL_PRECISION;

/// Opaque identifier assigned by the remote store on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct IncidentId(pub String);

impl IncidentId {
    pub fn new_random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IncidentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A WGS84 point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the point only if both components are finite and in range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    pub fn is_valid(&self) -> bool {
        Self::checked(self.lat, self.lng).is_some()
    }

    /// Fallback label used when no address is known, e.g. `"Lat 51.50000, Lng -0.12000"`.
    pub fn label(&self) -> String {
        format!(
            "Lat {:.prec$}, Lng {:.prec$}",
            self.lat,
            self.lng,
            prec = COORD_LABEL_PRECISION
        )
    }
}

/// The canonical replicated incident, as seen by consumers of the replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: IncidentId,
    pub category: Category,
    pub description: String,
    pub location_label: String,
    pub coordinates: Option<Coordinates>,
    /// Server-assigned commit time. Legacy records may lack one.
    pub created_at: Option<DateTime<Utc>>,
}

impl Incident {
    pub fn category_label(&self) -> &'static str {
        self.category.label()
    }
}

/// A place returned by the place-search service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub label: String,
    pub lat: f64,
    pub lng: f64,
}

impl Suggestion {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

/// Where a resolved location's label came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LabelSource {
    /// Reverse-geocoded address.
    Geocoded,
    /// Formatted coordinates, because the address lookup failed or is unavailable.
    CoordinateFallback,
    /// Adopted from a place-search suggestion.
    Suggestion,
}

/// A canonical `{label, coordinates}` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub label: String,
    pub coordinates: Coordinates,
    pub label_source: LabelSource,
}

impl ResolvedLocation {
    /// `true` when a point was obtained but its label had to fall back to raw coordinates.
    pub fn is_label_degraded(&self) -> bool {
        self.label_source == LabelSource::CoordinateFallback
    }
}
