//! Entry points for the presentation layer.
//!
//! Each command takes the shared [`AppState`](crate::state::AppState) and
//! returns a serializable DTO or a [`CivicError`](civicwatch_shared::CivicError).

pub mod location;
pub mod report;
pub mod view;
