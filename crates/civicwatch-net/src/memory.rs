//! In-process remote collection.
//!
//! The collection runs in a dedicated tokio task and is driven through a
//! typed command channel, the same way a networked backend would be. It
//! assigns ids and commit timestamps itself and publishes every change as
//! a full snapshot to all subscribers. Fault injection commands let callers
//! exercise the degraded paths (rejected writes, refused or dropped
//! subscriptions).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use civicwatch_shared::{IncidentId, IncidentRecord, NewIncident};

use crate::collection::{OrderBy, RemoteCollection, SnapshotStream, SortDirection};
use crate::error::{NetError, Result};

type Snapshot = Arc<Vec<IncidentRecord>>;

/// Commands sent *into* the collection task.
#[derive(Debug)]
pub enum CollectionCommand {
    /// Commit a new record.
    Create {
        payload: NewIncident,
        reply: oneshot::Sender<Result<IncidentId>>,
    },
    /// Open a snapshot channel.
    Subscribe(oneshot::Sender<Result<watch::Receiver<Snapshot>>>),
    /// Insert records verbatim (legacy documents, fixtures).
    Seed(Vec<IncidentRecord>),
    /// Reject the next write with the given reason.
    FailNextWrite(String),
    /// Refuse subsequent subscribe requests while set.
    RefuseSubscriptions(Option<String>),
    /// Close every open snapshot channel.
    DropSubscribers,
    /// Return the number of stored records.
    Count(oneshot::Sender<usize>),
    /// Stop the task.
    Shutdown,
}

/// Handle to an in-process collection task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    cmd_tx: mpsc::Sender<CollectionCommand>,
}

struct CollectionState {
    records: Vec<IncidentRecord>,
    snapshot_tx: watch::Sender<Snapshot>,
    last_commit: Option<DateTime<Utc>>,
    fail_next_write: Option<String>,
    refuse_subscriptions: Option<String>,
}

impl CollectionState {
    fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            records: Vec::new(),
            snapshot_tx,
            last_commit: None,
            fail_next_write: None,
            refuse_subscriptions: None,
        }
    }

    /// Server clock, forced strictly increasing so commits never tie.
    fn next_commit_time(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_commit {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_commit = Some(now);
        now
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(Arc::new(self.records.clone()));
        debug!(
            records = self.records.len(),
            subscribers = self.snapshot_tx.receiver_count(),
            "Published snapshot"
        );
    }

    fn handle(&mut self, cmd: CollectionCommand) -> bool {
        match cmd {
            CollectionCommand::Create { payload, reply } => {
                let result = match self.fail_next_write.take() {
                    Some(reason) => {
                        warn!(reason = %reason, "Rejecting write (injected)");
                        Err(NetError::WriteRejected(reason))
                    }
                    None => {
                        let id = IncidentId::new_random();
                        let created_at = self.next_commit_time();
                        self.records.push(payload.into_record(id.clone(), created_at));
                        info!(incident = %id, "Record committed");
                        self.publish();
                        Ok(id)
                    }
                };
                let _ = reply.send(result);
            }
            CollectionCommand::Subscribe(reply) => {
                let result = match &self.refuse_subscriptions {
                    Some(reason) => Err(NetError::SubscriptionRefused(reason.clone())),
                    None => Ok(self.snapshot_tx.subscribe()),
                };
                let _ = reply.send(result);
            }
            CollectionCommand::Seed(records) => {
                self.records.extend(records);
                self.publish();
            }
            CollectionCommand::FailNextWrite(reason) => {
                self.fail_next_write = Some(reason);
            }
            CollectionCommand::RefuseSubscriptions(reason) => {
                self.refuse_subscriptions = reason;
            }
            CollectionCommand::DropSubscribers => {
                // Replacing the sender closes every receiver handed out so far.
                let (snapshot_tx, _) = watch::channel(Arc::new(self.records.clone()));
                self.snapshot_tx = snapshot_tx;
                info!("Dropped all snapshot subscribers");
            }
            CollectionCommand::Count(reply) => {
                let _ = reply.send(self.records.len());
            }
            CollectionCommand::Shutdown => {
                info!("Collection shutdown requested");
                return false;
            }
        }
        true
    }
}

impl MemoryCollection {
    /// Spawn the collection task on the current tokio runtime.
    pub fn spawn() -> Self {
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<CollectionCommand>(256);

        tokio::spawn(async move {
            let mut state = CollectionState::new();
            while let Some(cmd) = cmd_rx.recv().await {
                if !state.handle(cmd) {
                    break;
                }
            }
            info!("Collection task terminated");
        });

        Self { cmd_tx }
    }

    async fn send(&self, cmd: CollectionCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| NetError::CollectionClosed)
    }

    pub async fn seed(&self, records: Vec<IncidentRecord>) -> Result<()> {
        self.send(CollectionCommand::Seed(records)).await
    }

    pub async fn fail_next_write(&self, reason: impl Into<String>) -> Result<()> {
        self.send(CollectionCommand::FailNextWrite(reason.into()))
            .await
    }

    pub async fn refuse_subscriptions(&self, reason: Option<String>) -> Result<()> {
        self.send(CollectionCommand::RefuseSubscriptions(reason))
            .await
    }

    pub async fn drop_subscribers(&self) -> Result<()> {
        self.send(CollectionCommand::DropSubscribers).await
    }

    pub async fn count(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.send(CollectionCommand::Count(tx)).await?;
        rx.await.map_err(|_| NetError::CollectionClosed)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(CollectionCommand::Shutdown).await
    }
}

#[async_trait]
impl RemoteCollection for MemoryCollection {
    async fn create_record(&self, payload: NewIncident) -> Result<IncidentId> {
        let (tx, rx) = oneshot::channel();
        self.send(CollectionCommand::Create { payload, reply: tx })
            .await?;
        rx.await.map_err(|_| NetError::CollectionClosed)?
    }

    async fn subscribe(&self, order: OrderBy) -> Result<SnapshotStream> {
        let (tx, rx) = oneshot::channel();
        self.send(CollectionCommand::Subscribe(tx)).await?;
        let receiver = rx.await.map_err(|_| NetError::CollectionClosed)??;
        debug!(field = %order.field, direction = ?order.direction, "Snapshot channel opened");
        Ok(snapshot_stream(receiver, order))
    }
}

/// Turn a watch receiver into a stream that yields the current snapshot
/// immediately, then one snapshot per change, and ends when the sender goes.
fn snapshot_stream(receiver: watch::Receiver<Snapshot>, order: OrderBy) -> SnapshotStream {
    futures::stream::unfold((receiver, true), move |(mut rx, first)| {
        let order = order.clone();
        async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let mut records = rx.borrow_and_update().as_ref().clone();
            sort_records(&mut records, &order);
            Some((Ok(records), (rx, false)))
        }
    })
    .boxed()
}

/// Records without a timestamp sort after all timestamped ones.
fn sort_records(records: &mut [IncidentRecord], order: &OrderBy) {
    records.sort_by(|a, b| {
        let ord = match (a.created_at, b.created_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        match order.direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => match (a.created_at, b.created_at) {
                (Some(_), Some(_)) => ord.reverse(),
                _ => ord,
            },
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use civicwatch_shared::{Category, Coordinates};

    fn payload(desc: &str) -> NewIncident {
        NewIncident::new(Category::Fire, desc, "Dock road", None)
    }

    #[tokio::test]
    async fn subscribe_yields_initial_then_updates() {
        let collection = MemoryCollection::spawn();
        let mut stream = collection
            .subscribe(OrderBy::recent_first())
            .await
            .unwrap();

        let initial = stream.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        collection.create_record(payload("first")).await.unwrap();
        collection.create_record(payload("second")).await.unwrap();

        // The watch channel may coalesce the two commits; the last snapshot
        // always holds both records, newest first.
        let mut latest = stream.next().await.unwrap().unwrap();
        if latest.len() < 2 {
            latest = stream.next().await.unwrap().unwrap();
        }
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].description, "second");
        assert_eq!(latest[1].description, "first");
    }

    #[tokio::test]
    async fn commit_times_are_strictly_increasing() {
        let collection = MemoryCollection::spawn();
        for i in 0..20 {
            collection
                .create_record(payload(&format!("n{i}")))
                .await
                .unwrap();
        }
        let mut stream = collection
            .subscribe(OrderBy::recent_first())
            .await
            .unwrap();
        let snapshot = stream.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 20);
        for pair in snapshot.windows(2) {
            assert!(pair[0].created_at > pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn injected_write_failure_is_one_shot() {
        let collection = MemoryCollection::spawn();
        collection.fail_next_write("quota exceeded").await.unwrap();

        let err = collection.create_record(payload("x")).await.unwrap_err();
        assert!(matches!(err, NetError::WriteRejected(ref r) if r == "quota exceeded"));
        assert_eq!(collection.count().await.unwrap(), 0);

        collection.create_record(payload("x")).await.unwrap();
        assert_eq!(collection.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dropped_subscribers_see_end_of_stream() {
        let collection = MemoryCollection::spawn();
        let mut stream = collection
            .subscribe(OrderBy::recent_first())
            .await
            .unwrap();
        stream.next().await.unwrap().unwrap();

        collection.drop_subscribers().await.unwrap();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn refused_subscription_is_an_error() {
        let collection = MemoryCollection::spawn();
        collection
            .refuse_subscriptions(Some("offline".into()))
            .await
            .unwrap();
        let err = collection
            .subscribe(OrderBy::recent_first())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, NetError::SubscriptionRefused(_)));
    }

    #[tokio::test]
    async fn untimestamped_seed_records_sort_last() {
        let collection = MemoryCollection::spawn();
        collection
            .seed(vec![IncidentRecord {
                id: IncidentId::from("legacy"),
                type_value: Some("riot".into()),
                type_label: None,
                color: None,
                description: "old".into(),
                location: "Somewhere".into(),
                coords: Some(Coordinates::new(1.0, 2.0).into()),
                created_at: None,
            }])
            .await
            .unwrap();
        collection.create_record(payload("new")).await.unwrap();

        let mut stream = collection
            .subscribe(OrderBy::recent_first())
            .await
            .unwrap();
        let snapshot = stream.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].description, "new");
        assert_eq!(snapshot[1].id.as_str(), "legacy");
    }

    #[tokio::test]
    async fn shutdown_closes_the_handle() {
        let collection = MemoryCollection::spawn();
        collection.shutdown().await.unwrap();
        tokio::task::yield_now().await;
        let err = collection.create_record(payload("late")).await.unwrap_err();
        assert!(matches!(err, NetError::CollectionClosed));
    }
}
