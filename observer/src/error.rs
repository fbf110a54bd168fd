//! Error types for the change-observation core.

use thiserror::Error;

/// Result type alias for observer operations.
pub type Result<T> = std::result::Result<T, ObserverError>;

/// Errors that can occur while subscribing to or observing a location.
#[derive(Error, Debug)]
pub enum ObserverError {
    /// The location does not exist on disk.
    #[error("location not found: {0}")]
    LocationNotFound(String),

    /// The underlying watch backend rejected the subscription.
    #[error("watch backend error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The delivery channel to the consumer context is closed.
    #[error("change delivery channel closed")]
    DeliveryClosed,
}
