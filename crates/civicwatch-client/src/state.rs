//! Application state shared by every command.
//!
//! [`AppState`] wires the configured services together: one remote
//! collection feeds both the dashboard and the submission workflow, and
//! the location resolver is shared by every lookup.

use std::sync::Arc;

use tokio::sync::Mutex;

use civicwatch_net::{
    DeviceLocator, GoogleGeocoder, LocationResolver, NetError, NominatimSearch, RemoteCollection,
};

use crate::config::CoreConfig;
use crate::dashboard::Dashboard;
use crate::workflow::SubmissionWorkflow;

pub type SharedCollection = Arc<dyn RemoteCollection>;

pub struct AppState {
    pub config: CoreConfig,

    /// Place search, reverse geocoding and device position.
    pub resolver: LocationResolver,

    /// Live replica, filters and viewport.
    pub dashboard: Dashboard<SharedCollection>,

    /// The report currently being composed. Locked across a submission,
    /// so a draft is never committed twice.
    pub workflow: Mutex<SubmissionWorkflow<SharedCollection>>,
}

impl AppState {
    /// Build the state with the HTTP place-search and reverse-geocode clients
    /// described by `config`.
    pub fn new(
        config: CoreConfig,
        collection: SharedCollection,
        device: Arc<dyn DeviceLocator>,
    ) -> Result<Self, NetError> {
        let places = NominatimSearch::new(
            config.place_search_url.clone(),
            config.suggestion_limit,
            config.http_timeout(),
        )?;
        let geocoder = GoogleGeocoder::new(
            config.reverse_geocode_url.clone(),
            config.geocode_api_key.clone(),
            config.http_timeout(),
        )?;
        if config.geocode_api_key.is_empty() {
            tracing::warn!("GEOCODE_API_KEY not set, current positions will be labelled with coordinates");
        }

        let resolver = LocationResolver::new(Arc::new(places), Arc::new(geocoder), device);
        Ok(Self::with_resolver(config, collection, resolver))
    }

    pub fn with_resolver(config: CoreConfig, collection: SharedCollection, resolver: LocationResolver) -> Self {
        let dashboard = Dashboard::new(collection.clone(), config.projector());
        let workflow = SubmissionWorkflow::new(collection, config.coordinate_policy);
        Self {
            config,
            resolver,
            dashboard,
            workflow: Mutex::new(workflow),
        }
    }
}
