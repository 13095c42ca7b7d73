use thiserror::Error;

use civicwatch_shared::CivicError;

/// Errors produced by the replica layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The push channel could not be opened.
    #[error("Could not open live updates: {0}")]
    Open(String),

    /// The push channel failed or was closed by the remote side.
    #[error("Live updates dropped: {0}")]
    Dropped(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for CivicError {
    fn from(e: StoreError) -> Self {
        CivicError::Subscription(e.to_string())
    }
}
