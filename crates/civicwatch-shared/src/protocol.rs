//! Record formats exchanged with the remote incident collection.
//!
//! Records are read leniently: older documents may carry an unknown
//! category code, coordinates encoded as strings, or no timestamp at all.
//! None of these cause a record to be dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::category::Category;
use crate::types::{Coordinates, Incident, IncidentId};

/// A stored incident document, as delivered by the subscription channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: IncidentId,
    /// Category code.
    #[serde(default)]
    pub type_value: Option<String>,
    /// Denormalised category label written at submit time.
    #[serde(default, rename = "type")]
    pub type_label: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub coords: Option<RawCoords>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Coordinates as found in a stored document; either half may be missing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RawCoords {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
}

impl RawCoords {
    pub fn normalize(&self) -> Option<Coordinates> {
        Coordinates::checked(self.lat?, self.lng?)
    }
}

impl From<Coordinates> for RawCoords {
    fn from(c: Coordinates) -> Self {
        Self {
            lat: Some(c.lat),
            lng: Some(c.lng),
        }
    }
}

/// A number, a numeric string, or anything else as `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

impl IncidentRecord {
    pub fn to_incident(&self) -> Incident {
        Incident {
            id: self.id.clone(),
            category: Category::from_code_or_other(self.type_value.as_deref()),
            description: self.description.clone(),
            location_label: self.location.clone(),
            coordinates: self.coords.as_ref().and_then(RawCoords::normalize),
            created_at: self.created_at,
        }
    }
}

impl From<&IncidentRecord> for Incident {
    fn from(r: &IncidentRecord) -> Self {
        r.to_incident()
    }
}

/// Asks the remote store to stamp the record with its own clock at commit time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TimestampRequest {
    #[default]
    #[serde(rename = "SERVER_TIMESTAMP")]
    Server,
}

/// The write payload for a new incident.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewIncident {
    pub type_value: Category,
    #[serde(rename = "type")]
    pub type_label: String,
    pub color: String,
    pub description: String,
    pub location: String,
    pub coords: Option<Coordinates>,
    pub created_at: TimestampRequest,
}

impl NewIncident {
    /// Build a payload; label and colour come from the category table.
    pub fn new(
        category: Category,
        description: impl Into<String>,
        location: impl Into<String>,
        coords: Option<Coordinates>,
    ) -> Self {
        Self {
            type_value: category,
            type_label: category.option_label(),
            color: category.color_hex().to_string(),
            description: description.into(),
            location: location.into(),
            coords,
            created_at: TimestampRequest::Server,
        }
    }

    /// Materialise the stored record once the store has assigned id and time.
    pub fn into_record(self, id: IncidentId, created_at: DateTime<Utc>) -> IncidentRecord {
        IncidentRecord {
            id,
            type_value: Some(self.type_value.code().to_string()),
            type_label: Some(self.type_label),
            color: Some(self.color),
            description: self.description,
            location: self.location,
            coords: self.coords.map(RawCoords::from),
            created_at: Some(created_at),
        }
    }
}
