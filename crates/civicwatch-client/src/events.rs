use chrono::{DateTime, Utc};
use serde::Serialize;

use civicwatch_shared::constants::{MISSING_DESCRIPTION, MISSING_LOCATION, MISSING_TIMESTAMP};
use civicwatch_shared::{Coordinates, Incident};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Render a commit time for display. Records without one show a dash.
pub fn format_timestamp(created_at: Option<DateTime<Utc>>) -> String {
    match created_at {
        Some(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        None => MISSING_TIMESTAMP.to_string(),
    }
}

/// One row of the incident list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentCard {
    pub id: String,
    pub category: String,
    pub emoji: &'static str,
    pub color: &'static str,
    pub description: String,
    pub location: String,
    pub reported_at: String,
}

impl From<&Incident> for IncidentCard {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.as_str().to_string(),
            category: incident.category_label().to_string(),
            emoji: incident.category.emoji(),
            color: incident.category.color_hex(),
            description: or_placeholder(&incident.description, MISSING_DESCRIPTION),
            location: or_placeholder(&incident.location_label, MISSING_LOCATION),
            reported_at: format_timestamp(incident.created_at),
        }
    }
}

/// A map marker. Only incidents with valid coordinates get one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub id: String,
    pub position: Coordinates,
    pub emoji: &'static str,
    pub color: &'static str,
    pub popup: MarkerPopup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerPopup {
    pub title: String,
    pub description: String,
    pub location: String,
    pub reported_at: String,
}

impl MarkerSpec {
    pub fn for_incident(incident: &Incident) -> Option<Self> {
        let position = incident.coordinates.filter(Coordinates::is_valid)?;
        Some(Self {
            id: incident.id.as_str().to_string(),
            position,
            emoji: incident.category.emoji(),
            color: incident.category.color_hex(),
            popup: MarkerPopup {
                title: format!("{} {}", incident.category.emoji(), incident.category_label()),
                description: incident.description.clone(),
                location: or_placeholder(&incident.location_label, MISSING_LOCATION),
                reported_at: format_timestamp(incident.created_at),
            },
        })
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}
