//! The remote incident collection, as consumed by the core.
//!
//! A collection accepts writes and serves full-snapshot subscriptions:
//! every item yielded by a [`SnapshotStream`] is the complete current
//! state of the collection, never a diff.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use civicwatch_shared::constants::ORDER_FIELD;
use civicwatch_shared::{IncidentId, IncidentRecord, NewIncident};

use crate::error::Result;

/// A stream of full snapshots. Ends when the channel is closed remotely.
pub type SnapshotStream = BoxStream<'static, Result<Vec<IncidentRecord>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Ordering requested for a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// `createdAt` descending, the only ordering the replica uses.
    pub fn recent_first() -> Self {
        Self::desc(ORDER_FIELD)
    }
}

#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Commit one record. The store assigns the id and the timestamp.
    async fn create_record(&self, payload: NewIncident) -> Result<IncidentId>;

    /// Open a push channel delivering full snapshots in the given order.
    async fn subscribe(&self, order: OrderBy) -> Result<SnapshotStream>;
}

#[async_trait]
impl<T: RemoteCollection + ?Sized> RemoteCollection for Arc<T> {
    async fn create_record(&self, payload: NewIncident) -> Result<IncidentId> {
        (**self).create_record(payload).await
    }

    async fn subscribe(&self, order: OrderBy) -> Result<SnapshotStream> {
        (**self).subscribe(order).await
    }
}
