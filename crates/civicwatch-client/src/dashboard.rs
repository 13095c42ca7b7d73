//! Live dashboard: the replica, the user's filter inputs and the map
//! viewport, kept consistent with each other.
//!
//! Every change to any input (a replica delivery, a filter toggle, a new
//! search term, a lost channel) recomputes the visible subset and the
//! viewport from scratch and publishes one [`ViewUpdate`]. Consumers hold a
//! `watch` receiver, so a slow consumer only ever sees the newest view.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info};

use civicwatch_net::RemoteCollection;
use civicwatch_shared::{CategoryFilter, Incident};
use civicwatch_store::{
    IncidentStore, LiveStatus, Replica, ReplicaListener, StoreError, ViewQuery, Viewport,
    ViewportProjector,
};

use crate::events::{IncidentCard, MarkerSpec};

/// One consistent `(replica, visible subset, viewport)` triple.
#[derive(Debug, Clone)]
pub struct ViewUpdate {
    /// Incremented on every recompute.
    pub revision: u64,
    pub replica: Replica,
    pub query: ViewQuery,
    pub visible: Arc<[Incident]>,
    pub viewport: Viewport,
    pub status: LiveStatus,
}

impl ViewUpdate {
    pub fn shown(&self) -> usize {
        self.visible.len()
    }

    pub fn total(&self) -> usize {
        self.replica.len()
    }

    pub fn cards(&self) -> Vec<IncidentCard> {
        self.visible.iter().map(IncidentCard::from).collect()
    }

    pub fn markers(&self) -> Vec<MarkerSpec> {
        self.visible.iter().filter_map(MarkerSpec::for_incident).collect()
    }
}

struct ViewInputs {
    revision: u64,
    replica: Replica,
    query: ViewQuery,
    status: LiveStatus,
}

struct ViewState {
    inputs: Mutex<ViewInputs>,
    projector: ViewportProjector,
    updates: watch::Sender<ViewUpdate>,
}

impl ViewState {
    fn modify<F>(&self, change: F) -> ViewUpdate
    where
        F: FnOnce(&mut ViewInputs),
    {
        let mut inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        change(&mut inputs);
        inputs.revision += 1;

        let visible: Arc<[Incident]> = Arc::from(inputs.query.apply(&inputs.replica));
        let update = ViewUpdate {
            revision: inputs.revision,
            replica: inputs.replica.clone(),
            query: inputs.query.clone(),
            viewport: self.projector.project(&visible),
            visible,
            status: inputs.status.clone(),
        };
        debug!(
            revision = update.revision,
            shown = update.shown(),
            total = update.total(),
            "View recomputed"
        );

        // Published under the lock so revisions reach consumers in order.
        self.updates.send_replace(update.clone());
        update
    }
}

/// Feeds replica deliveries into the view.
struct ViewFeed(Arc<ViewState>);

impl ReplicaListener for ViewFeed {
    fn on_update(&self, replica: &Replica) {
        let replica = replica.clone();
        self.0.modify(|inputs| {
            inputs.replica = replica;
            inputs.status = LiveStatus::Live;
        });
    }

    fn on_unavailable(&self, error: &StoreError) {
        self.0
            .modify(|inputs| inputs.status = LiveStatus::Unavailable(error.to_string()));
    }
}

pub struct Dashboard<C> {
    store: tokio::sync::Mutex<IncidentStore<C>>,
    state: Arc<ViewState>,
}

impl<C: RemoteCollection> Dashboard<C> {
    pub fn new(collection: C, projector: ViewportProjector) -> Self {
        let replica: Replica = Arc::from(Vec::new());
        let initial = ViewUpdate {
            revision: 0,
            replica: replica.clone(),
            query: ViewQuery::default(),
            visible: Arc::from(Vec::new()),
            viewport: projector.fallback(),
            status: LiveStatus::Idle,
        };
        let (updates, _) = watch::channel(initial);

        Self {
            store: tokio::sync::Mutex::new(IncidentStore::new(collection)),
            state: Arc::new(ViewState {
                inputs: Mutex::new(ViewInputs {
                    revision: 0,
                    replica,
                    query: ViewQuery::default(),
                    status: LiveStatus::Idle,
                }),
                projector,
                updates,
            }),
        }
    }

    /// Open the live channel. Restarting replaces the previous channel.
    pub async fn start(&self) -> Result<(), StoreError> {
        let mut store = self.store.lock().await;
        self.state.modify(|inputs| inputs.status = LiveStatus::Connecting);

        match store.subscribe(ViewFeed(self.state.clone())).await {
            Ok(subscription) => {
                info!(subscription = subscription.id(), "Dashboard live");
                Ok(())
            }
            Err(e) => {
                self.state
                    .modify(|inputs| inputs.status = LiveStatus::Unavailable(e.to_string()));
                Err(e)
            }
        }
    }

    /// Close the live channel. The last view stays in place.
    pub async fn stop(&self) {
        self.store.lock().await.unsubscribe();
        self.state.modify(|inputs| inputs.status = LiveStatus::Idle);
    }

    pub fn updates(&self) -> watch::Receiver<ViewUpdate> {
        self.state.updates.subscribe()
    }

    pub fn current(&self) -> ViewUpdate {
        self.state.updates.borrow().clone()
    }

    pub fn set_category_filter(&self, category: CategoryFilter) -> ViewUpdate {
        self.state.modify(|inputs| inputs.query.category = category)
    }

    pub fn set_search(&self, term: impl Into<String>) -> ViewUpdate {
        let term = term.into();
        self.state.modify(|inputs| inputs.query.search = term)
    }

    /// Back to every category and no search term.
    pub fn reset_filters(&self) -> ViewUpdate {
        self.state.modify(|inputs| inputs.query = ViewQuery::default())
    }
}
