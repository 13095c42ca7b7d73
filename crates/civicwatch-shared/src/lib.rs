//! # civicwatch-shared
//!
//! Data model shared by every civicwatch crate: the incident record and its
//! wire format, the closed category table, and the error taxonomy surfaced
//! to the presentation layer.

pub mod category;
pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use category::{Category, CategoryFilter, CategoryMeta};
pub use error::{CivicError, LocationError, ValidationError};
pub use protocol::{IncidentRecord, NewIncident, RawCoords, TimestampRequest};
pub use types::{Coordinates, Incident, IncidentId, LabelSource, ResolvedLocation, Suggestion};
