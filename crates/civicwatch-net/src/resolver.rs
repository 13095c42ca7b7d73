//! Turns raw location input into a canonical `{label, coordinates}` pair.
//!
//! Lookup failures degrade the label, never the operation: a search that
//! fails yields no suggestions plus a signal, and a reverse geocode that
//! fails yields the formatted coordinates as the label. Only the absence
//! of any point is reported as [`LocationError::Unavailable`].

use std::sync::Arc;

use tracing::{info, warn};

use civicwatch_shared::{LabelSource, LocationError, ResolvedLocation, Suggestion};

use crate::device::DeviceLocator;
use crate::error::NetError;
use crate::geocode::ReverseGeocoder;
use crate::places::PlaceSearch;

/// Result of a suggestion query. `failure` is set when the lookup failed
/// and `items` is empty because of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionBatch {
    pub items: Vec<Suggestion>,
    pub failure: Option<LocationError>,
}

impl SuggestionBatch {
    fn failed(err: LocationError) -> Self {
        Self {
            items: Vec::new(),
            failure: Some(err),
        }
    }
}

#[derive(Clone)]
pub struct LocationResolver {
    places: Arc<dyn PlaceSearch>,
    geocoder: Arc<dyn ReverseGeocoder>,
    device: Arc<dyn DeviceLocator>,
}

impl LocationResolver {
    pub fn new(
        places: Arc<dyn PlaceSearch>,
        geocoder: Arc<dyn ReverseGeocoder>,
        device: Arc<dyn DeviceLocator>,
    ) -> Self {
        Self {
            places,
            geocoder,
            device,
        }
    }

    /// Search for places matching `query`. A blank query issues no request.
    pub async fn suggest(&self, query: &str) -> SuggestionBatch {
        let query = query.trim();
        if query.is_empty() {
            return SuggestionBatch::default();
        }

        match self.places.search(query).await {
            Ok(items) => SuggestionBatch {
                items,
                failure: None,
            },
            Err(e) => {
                warn!(query = %query, error = %e, "Suggestion lookup failed");
                SuggestionBatch::failed(LocationError::LookupFailed(format!(
                    "suggestion lookup failed: {e}"
                )))
            }
        }
    }

    /// Locate the device and label the point, falling back to the
    /// formatted coordinates when no address can be obtained.
    pub async fn resolve_current_position(&self) -> Result<ResolvedLocation, LocationError> {
        let point = self
            .device
            .current_position()
            .await
            .map_err(|e| match e {
                NetError::PermissionDenied | NetError::Unsupported => {
                    LocationError::Unavailable(e.to_string())
                }
                other => LocationError::Unavailable(format!("device position failed: {other}")),
            })?;

        if !point.is_valid() {
            return Err(LocationError::Unavailable(format!(
                "device returned an invalid point ({}, {})",
                point.lat, point.lng
            )));
        }

        match self.geocoder.reverse_geocode(point).await {
            Ok(address) => {
                info!(lat = point.lat, lng = point.lng, "Current position resolved");
                Ok(ResolvedLocation {
                    label: address,
                    coordinates: point,
                    label_source: LabelSource::Geocoded,
                })
            }
            Err(e) => {
                warn!(error = %e, "Reverse geocode failed, labelling with coordinates");
                Ok(ResolvedLocation {
                    label: point.label(),
                    coordinates: point,
                    label_source: LabelSource::CoordinateFallback,
                })
            }
        }
    }

    /// Adopt a previously fetched suggestion. No network call.
    pub fn from_suggestion(suggestion: &Suggestion) -> ResolvedLocation {
        ResolvedLocation {
            label: suggestion.label.clone(),
            coordinates: suggestion.coordinates(),
            label_source: LabelSource::Suggestion,
        }
    }
}
