use thiserror::Error;

/// Errors produced by the external-interface layer.
#[derive(Error, Debug)]
pub enum NetError {
    /// Transport-level HTTP failure (DNS, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Service responded with status {0}")]
    Status(u16),

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// A required endpoint or credential is not configured.
    #[error("Service not configured: {0}")]
    NotConfigured(&'static str),

    /// The remote collection task is gone.
    #[error("Remote collection closed")]
    CollectionClosed,

    /// The remote collection refused a write.
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// The remote collection refused to open a subscription.
    #[error("Subscription refused: {0}")]
    SubscriptionRefused(String),

    /// The user denied access to device location.
    #[error("Location permission denied")]
    PermissionDenied,

    /// The device cannot provide a position.
    #[error("Geolocation is not supported on this device")]
    Unsupported,
}

pub type Result<T> = std::result::Result<T, NetError>;
