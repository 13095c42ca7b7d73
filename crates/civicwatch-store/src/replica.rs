//! Subscription-driven replica of the remote incident collection.
//!
//! Each [`IncidentStore`] owns at most one push channel. Snapshots read
//! from the channel are rebuilt into a sorted replica by a pump task and
//! parked in a `watch` slot; a delivery task hands the newest parked
//! replica to the listener. Deliveries for one subscription never overlap,
//! and a replica superseded before it could be delivered is discarded
//! rather than queued.

use std::cell::Cell;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use civicwatch_net::{OrderBy, RemoteCollection, SnapshotStream};
use civicwatch_shared::{Incident, IncidentRecord};

use crate::error::{Result, StoreError};

/// Read-only, ordered view of the collection (newest first).
pub type Replica = Arc<[Incident]>;

thread_local! {
    // Id of the subscription whose listener is running on this thread, 0 if none.
    static IN_DELIVERY: Cell<u64> = const { Cell::new(0) };
}

/// Receives replica deliveries. Closures `Fn(&Replica)` implement this directly.
pub trait ReplicaListener: Send + Sync + 'static {
    fn on_update(&self, replica: &Replica);

    /// The channel was lost; the replica stays frozen at its last state.
    fn on_unavailable(&self, _error: &StoreError) {}
}

impl<F> ReplicaListener for F
where
    F: Fn(&Replica) + Send + Sync + 'static,
{
    fn on_update(&self, replica: &Replica) {
        self(replica)
    }
}

/// Health of the live-update channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "camelCase")]
pub enum LiveStatus {
    Idle,
    Connecting,
    Live,
    Unavailable(String),
}

struct Shared {
    replica: RwLock<Replica>,
    status: RwLock<LiveStatus>,
}

impl Shared {
    fn set_replica(&self, replica: Replica) {
        *self.replica.write().unwrap_or_else(PoisonError::into_inner) = replica;
    }

    fn set_status(&self, status: LiveStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

/// Latest state parked by the pump for the delivery task.
#[derive(Clone, Default)]
struct Pending {
    version: u64,
    replica: Option<Replica>,
    lost: Option<StoreError>,
}

struct SubscriptionInner {
    id: u64,
    closed: AtomicBool,
    // Held for the duration of each listener call.
    gate: Mutex<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Handle to one open push channel. Clones share the same channel.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        !self.inner.closed.load(AtomicOrdering::SeqCst)
    }

    /// Close the channel. Once this returns no further listener call
    /// starts. Safe to call any number of times, including from the
    /// listener itself.
    pub fn unsubscribe(&self) {
        if self.inner.closed.swap(true, AtomicOrdering::SeqCst) {
            return;
        }

        for task in self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }

        // Wait out a delivery running on another thread. A listener
        // unsubscribing itself already holds the gate.
        if IN_DELIVERY.with(Cell::get) != self.inner.id {
            drop(self.inner.gate.lock().unwrap_or_else(PoisonError::into_inner));
        }

        info!(subscription = self.inner.id, "Unsubscribed from incidents");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Process-local replica of the remote incident collection.
pub struct IncidentStore<C> {
    collection: C,
    shared: Arc<Shared>,
    active: Option<Subscription>,
    next_id: u64,
}

impl<C: RemoteCollection> IncidentStore<C> {
    pub fn new(collection: C) -> Self {
        Self {
            collection,
            shared: Arc::new(Shared {
                replica: RwLock::new(Arc::from(Vec::new())),
                status: RwLock::new(LiveStatus::Idle),
            }),
            active: None,
            next_id: 1,
        }
    }

    /// Open the push channel (`createdAt` descending) and deliver every
    /// snapshot to `listener`. An already open channel is closed first.
    pub async fn subscribe<L: ReplicaListener>(&mut self, listener: L) -> Result<Subscription> {
        self.unsubscribe();

        let id = self.next_id;
        self.next_id += 1;
        self.shared.set_status(LiveStatus::Connecting);

        let stream = match self.collection.subscribe(OrderBy::recent_first()).await {
            Ok(stream) => stream,
            Err(e) => {
                let err = StoreError::Open(e.to_string());
                warn!(subscription = id, error = %e, "Could not open incident channel");
                self.shared
                    .set_status(LiveStatus::Unavailable(err.to_string()));
                return Err(err);
            }
        };

        let inner = Arc::new(SubscriptionInner {
            id,
            closed: AtomicBool::new(false),
            gate: Mutex::new(()),
            tasks: Mutex::new(Vec::with_capacity(2)),
        });

        let (pending_tx, pending_rx) = watch::channel(Pending::default());
        let pump_task = tokio::spawn(pump(stream, pending_tx, id));
        let delivery_task = tokio::spawn(deliver(
            pending_rx,
            listener,
            inner.clone(),
            self.shared.clone(),
        ));
        inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([pump_task, delivery_task]);

        info!(subscription = id, "Subscribed to incidents");

        let subscription = Subscription { inner };
        self.active = Some(subscription.clone());
        Ok(subscription)
    }

    /// Close the active channel, if any. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.active.take() {
            subscription.unsubscribe();
        }
    }

    pub fn active(&self) -> Option<&Subscription> {
        self.active.as_ref().filter(|s| s.is_active())
    }

    /// The replica as of the last delivery.
    pub fn replica(&self) -> Replica {
        self.shared
            .replica
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn status(&self) -> LiveStatus {
        self.shared
            .status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<C> Drop for IncidentStore<C> {
    fn drop(&mut self) {
        if let Some(subscription) = self.active.take() {
            subscription.unsubscribe();
        }
    }
}

/// Build a replica from one full snapshot, ignoring the channel's order.
pub fn build_replica(records: &[IncidentRecord]) -> Replica {
    let mut incidents: Vec<Incident> = records.iter().map(Incident::from).collect();
    incidents.sort_by(recent_first);
    Arc::from(incidents)
}

/// `createdAt` descending; untimestamped records last; ties broken by id.
fn recent_first(a: &Incident, b: &Incident) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.id.cmp(&b.id))
}

async fn pump(mut stream: SnapshotStream, pending: watch::Sender<Pending>, id: u64) {
    let mut version = 0u64;
    loop {
        match stream.next().await {
            Some(Ok(records)) => {
                version += 1;
                let replica = build_replica(&records);
                debug!(subscription = id, version, records = replica.len(), "Snapshot received");
                pending.send_modify(|p| {
                    p.version = version;
                    p.replica = Some(replica);
                });
            }
            Some(Err(e)) => {
                warn!(subscription = id, error = %e, "Incident channel failed");
                pending.send_modify(|p| p.lost = Some(StoreError::Dropped(e.to_string())));
                break;
            }
            None => {
                warn!(subscription = id, "Incident channel closed by remote");
                pending.send_modify(|p| {
                    p.lost = Some(StoreError::Dropped("channel closed by remote".into()))
                });
                break;
            }
        }
    }
}

async fn deliver<L: ReplicaListener>(
    mut pending: watch::Receiver<Pending>,
    listener: L,
    inner: Arc<SubscriptionInner>,
    shared: Arc<Shared>,
) {
    let mut delivered = 0u64;
    while pending.changed().await.is_ok() {
        let latest = pending.borrow_and_update().clone();
        if !deliver_latest(&latest, &mut delivered, &listener, &inner, &shared) {
            break;
        }
    }
}

/// Returns `false` once the subscription is finished.
fn deliver_latest<L: ReplicaListener>(
    latest: &Pending,
    delivered: &mut u64,
    listener: &L,
    inner: &SubscriptionInner,
    shared: &Shared,
) -> bool {
    let _gate = inner.gate.lock().unwrap_or_else(PoisonError::into_inner);
    if inner.closed.load(AtomicOrdering::SeqCst) {
        return false;
    }

    IN_DELIVERY.with(|c| c.set(inner.id));

    if let Some(replica) = latest.replica.as_ref().filter(|_| latest.version > *delivered) {
        if latest.version > *delivered + 1 {
            debug!(
                subscription = inner.id,
                skipped = latest.version - *delivered - 1,
                "Superseded snapshots discarded"
            );
        }
        *delivered = latest.version;
        shared.set_replica(replica.clone());
        shared.set_status(LiveStatus::Live);
        listener.on_update(replica);
    }

    let keep_going = match &latest.lost {
        Some(err) => {
            // The remote ended the channel; the handle stops reporting live.
            inner.closed.store(true, AtomicOrdering::SeqCst);
            shared.set_status(LiveStatus::Unavailable(err.to_string()));
            listener.on_unavailable(err);
            false
        }
        None => true,
    };

    IN_DELIVERY.with(|c| c.set(0));
    keep_going
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use civicwatch_net::NetError;
    use civicwatch_shared::{IncidentId, NewIncident};
    use tokio::sync::mpsc;

    type Feed = mpsc::UnboundedSender<std::result::Result<Vec<IncidentRecord>, NetError>>;

    /// A collection whose snapshots are pushed by the test.
    #[derive(Default)]
    struct ScriptedCollection {
        feeds: Mutex<Vec<Feed>>,
        refuse: bool,
    }

    impl ScriptedCollection {
        fn push(&self, feed: usize, records: Vec<IncidentRecord>) {
            let feeds = self.feeds.lock().unwrap();
            let _ = feeds[feed].send(Ok(records));
        }

        fn fail(&self, feed: usize) {
            let feeds = self.feeds.lock().unwrap();
            let _ = feeds[feed].send(Err(NetError::CollectionClosed));
        }

        fn close(&self, feed: usize) {
            let mut feeds = self.feeds.lock().unwrap();
            let (dead, _) = mpsc::unbounded_channel();
            feeds[feed] = dead;
        }

        fn feed_closed(&self, feed: usize) -> bool {
            self.feeds.lock().unwrap()[feed].is_closed()
        }
    }

    #[async_trait]
    impl RemoteCollection for ScriptedCollection {
        async fn create_record(&self, _payload: NewIncident) -> civicwatch_net::error::Result<IncidentId> {
            Err(NetError::WriteRejected("read-only".into()))
        }

        async fn subscribe(&self, _order: OrderBy) -> civicwatch_net::error::Result<SnapshotStream> {
            if self.refuse {
                return Err(NetError::SubscriptionRefused("offline".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            self.feeds.lock().unwrap().push(tx);
            Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed())
        }
    }

    fn record(id: &str, minute: Option<u32>) -> IncidentRecord {
        IncidentRecord {
            id: IncidentId::from(id),
            type_value: Some("fire".into()),
            type_label: None,
            color: None,
            description: format!("incident {id}"),
            location: "Lagos".into(),
            coords: None,
            created_at: minute.map(|m| Utc.with_ymd_and_hms(2024, 5, 1, 12, m, 0).unwrap()),
        }
    }

    fn ids(replica: &Replica) -> Vec<&str> {
        replica.iter().map(|i| i.id.as_str()).collect()
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Replica>) -> Replica {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("delivery timed out")
            .expect("listener dropped")
    }

    fn listener() -> (impl Fn(&Replica) + Send + Sync + 'static, mpsc::UnboundedReceiver<Replica>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (move |r: &Replica| {
            let _ = tx.send(r.clone());
        }, rx)
    }

    #[tokio::test]
    async fn delivery_replaces_replica_sorted_newest_first() {
        let collection = Arc::new(ScriptedCollection::default());
        let mut store = IncidentStore::new(collection.clone());
        let (on_update, mut rx) = listener();
        store.subscribe(on_update).await.unwrap();

        // Channel order is deliberately scrambled.
        collection.push(
            0,
            vec![record("b", Some(5)), record("legacy", None), record("c", Some(9)), record("a", Some(1))],
        );
        let first = next(&mut rx).await;
        assert_eq!(ids(&first), ["c", "b", "a", "legacy"]);
        assert_eq!(ids(&store.replica()), ["c", "b", "a", "legacy"]);
        assert_eq!(store.status(), LiveStatus::Live);

        // A smaller snapshot replaces, never merges.
        collection.push(0, vec![record("z", Some(30))]);
        let second = next(&mut rx).await;
        assert_eq!(ids(&second), ["z"]);
        assert_eq!(ids(&store.replica()), ["z"]);
    }

    #[tokio::test]
    async fn superseded_snapshots_are_discarded_not_queued() {
        let collection = Arc::new(ScriptedCollection::default());
        let mut store = IncidentStore::new(collection.clone());
        let (on_update, mut rx) = listener();
        store.subscribe(on_update).await.unwrap();

        collection.push(0, vec![record("a", Some(1))]);
        collection.push(0, vec![record("a", Some(1)), record("b", Some(2))]);
        collection.push(0, vec![record("a", Some(1)), record("b", Some(2)), record("c", Some(3))]);

        let mut seen = Vec::new();
        loop {
            let replica = next(&mut rx).await;
            seen.push(replica.len());
            if replica.len() == 3 {
                break;
            }
        }
        assert!(seen.len() <= 3);
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "out of order: {seen:?}");
        assert_eq!(ids(&store.replica()), ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_final() {
        let collection = Arc::new(ScriptedCollection::default());
        let mut store = IncidentStore::new(collection.clone());
        let (on_update, mut rx) = listener();
        let subscription = store.subscribe(on_update).await.unwrap();

        collection.push(0, vec![record("a", Some(1))]);
        next(&mut rx).await;

        subscription.unsubscribe();
        subscription.unsubscribe();
        store.unsubscribe();
        assert!(!subscription.is_active());
        assert!(store.active().is_none());

        collection.push(0, vec![record("b", Some(2))]);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(ids(&store.replica()), ["a"]);
    }

    #[tokio::test]
    async fn resubscribing_closes_the_former_channel() {
        let collection = Arc::new(ScriptedCollection::default());
        let mut store = IncidentStore::new(collection.clone());
        let (first_listener, mut first_rx) = listener();
        let (second_listener, mut second_rx) = listener();

        let first = store.subscribe(first_listener).await.unwrap();
        let second = store.subscribe(second_listener).await.unwrap();
        assert!(!first.is_active());
        assert!(second.is_active());
        assert_ne!(first.id(), second.id());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(collection.feed_closed(0), "former channel leaked");

        collection.push(1, vec![record("x", Some(1))]);
        assert_eq!(ids(&next(&mut second_rx).await), ["x"]);
        assert!(first_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn listener_may_unsubscribe_itself() {
        let collection = Arc::new(ScriptedCollection::default());
        let mut store = IncidentStore::new(collection.clone());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = slot.clone();
        let subscription = store
            .subscribe(move |r: &Replica| {
                let _ = tx.send(r.len());
                if let Some(s) = handle.lock().unwrap().as_ref() {
                    s.unsubscribe();
                }
            })
            .await
            .unwrap();
        *slot.lock().unwrap() = Some(subscription.clone());

        collection.push(0, vec![record("a", Some(1))]);
        assert_eq!(rx.recv().await, Some(1));
        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn open_failure_reports_subscription_error() {
        let collection = Arc::new(ScriptedCollection {
            refuse: true,
            ..Default::default()
        });
        let mut store = IncidentStore::new(collection);
        let (on_update, _rx) = listener();

        let err = store.subscribe(on_update).await.unwrap_err();
        assert!(matches!(err, StoreError::Open(_)));
        assert!(matches!(store.status(), LiveStatus::Unavailable(_)));
        assert!(store.replica().is_empty());
    }

    struct Recording {
        updates: mpsc::UnboundedSender<Replica>,
        lost: mpsc::UnboundedSender<StoreError>,
    }

    impl ReplicaListener for Recording {
        fn on_update(&self, replica: &Replica) {
            let _ = self.updates.send(replica.clone());
        }

        fn on_unavailable(&self, error: &StoreError) {
            let _ = self.lost.send(error.clone());
        }
    }

    #[tokio::test]
    async fn dropped_channel_freezes_replica_at_last_state() {
        for fail in [true, false] {
            let collection = Arc::new(ScriptedCollection::default());
            let mut store = IncidentStore::new(collection.clone());
            let (updates, mut updates_rx) = mpsc::unbounded_channel();
            let (lost, mut lost_rx) = mpsc::unbounded_channel();
            let subscription = store.subscribe(Recording { updates, lost }).await.unwrap();

            collection.push(0, vec![record("a", Some(1))]);
            next(&mut updates_rx).await;
            assert!(subscription.is_active());

            if fail {
                collection.fail(0);
            } else {
                collection.close(0);
            }
            let err = tokio::time::timeout(Duration::from_secs(2), lost_rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(err, StoreError::Dropped(_)));
            assert!(matches!(store.status(), LiveStatus::Unavailable(_)));
            assert_eq!(ids(&store.replica()), ["a"]);

            assert!(!subscription.is_active());
            assert!(store.active().is_none());
            // Closing a channel the remote already ended is a no-op.
            subscription.unsubscribe();
            store.unsubscribe();
        }
    }

    #[tokio::test]
    async fn resubscribing_after_a_lost_channel_goes_live_again() {
        let collection = Arc::new(ScriptedCollection::default());
        let mut store = IncidentStore::new(collection.clone());
        let (updates, _updates_rx) = mpsc::unbounded_channel();
        let (lost, mut lost_rx) = mpsc::unbounded_channel();
        let lost_one = store.subscribe(Recording { updates, lost }).await.unwrap();

        collection.fail(0);
        tokio::time::timeout(Duration::from_secs(2), lost_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(store.active().is_none());

        let (on_update, mut rx) = listener();
        let fresh = store.subscribe(on_update).await.unwrap();
        assert!(!lost_one.is_active());
        assert_eq!(store.active().map(Subscription::id), Some(fresh.id()));

        collection.push(1, vec![record("b", Some(2))]);
        assert_eq!(ids(&next(&mut rx).await), ["b"]);
        assert_eq!(store.status(), LiveStatus::Live);
    }
}
