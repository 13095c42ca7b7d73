//! # civicwatch-store
//!
//! Client-side replica of the remote incident collection and the pure
//! derivations computed from it: the visible subset ([`filter::apply`]) and
//! the map viewport ([`ViewportProjector::project`]).

pub mod filter;
pub mod replica;
pub mod viewport;

mod error;

pub use error::{Result, StoreError};
pub use filter::{apply, ViewQuery};
pub use replica::{build_replica, IncidentStore, LiveStatus, Replica, ReplicaListener, Subscription};
pub use viewport::{Bounds, Viewport, ViewportProjector};
