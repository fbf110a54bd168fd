//! Error types for container resolution and bulk queries.
//!
//! Everything here is terminal-but-local: a failure degrades one
//! feature (root-relative watching or the coarse query signal) without
//! touching the per-item observer path or the change log.

use thiserror::Error;

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// Errors from the resolver and the query monitor.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The container resolver could not produce a root location.
    #[error("failed to resolve container {container}: {reason}")]
    Resolution { container: String, reason: String },

    /// The bulk query refused to start.
    #[error("query failed to start: {0}")]
    QueryStart(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl QueryError {
    /// Resolution failure for the given container name (or the default
    /// container when `None`).
    pub fn resolution(container: Option<&str>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            container: container.unwrap_or("<default>").to_string(),
            reason: reason.into(),
        }
    }
}
