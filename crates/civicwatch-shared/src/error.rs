use thiserror::Error;

/// Umbrella error surfaced to the presentation layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CivicError {
    #[error("Live updates unavailable: {0}")]
    Subscription(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Failed to submit incident: {0}")]
    SubmitFailed(String),
}

impl CivicError {
    /// Only validation and write failures stop a submission.
    pub fn blocks_submission(&self) -> bool {
        matches!(self, CivicError::Validation(_) | CivicError::SubmitFailed(_))
    }
}

/// A required draft field is missing. Raised locally, never reaches the network.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("category is required")]
    MissingCategory,

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("location must not be empty")]
    EmptyLocation,

    #[error("coordinates are required for this report")]
    MissingCoordinates,
}

impl ValidationError {
    /// Name of the draft field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingCategory => "category",
            ValidationError::EmptyDescription => "description",
            ValidationError::EmptyLocation => "locationLabel",
            ValidationError::MissingCoordinates => "coordinates",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// No geographic point obtainable (permission denied, unsupported device).
    #[error("Location unavailable: {0}")]
    Unavailable(String),

    /// A search or reverse-geocode request failed.
    #[error("Location lookup failed: {0}")]
    LookupFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_field() {
        let err = CivicError::from(ValidationError::EmptyLocation);
        assert_eq!(err.to_string(), "Validation error: location must not be empty");
        assert_eq!(ValidationError::EmptyLocation.field(), "locationLabel");
    }

    #[test]
    fn only_validation_and_submit_block() {
        assert!(CivicError::from(ValidationError::MissingCategory).blocks_submission());
        assert!(CivicError::SubmitFailed("timeout".into()).blocks_submission());
        assert!(!CivicError::from(LocationError::LookupFailed("dns".into())).blocks_submission());
        assert!(!CivicError::Subscription("closed".into()).blocks_submission());
    }
}
