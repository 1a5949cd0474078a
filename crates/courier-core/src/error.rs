//! Error types for the collaborator interfaces.

use thiserror::Error;

/// Errors raised by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The platform is unreachable or the connection dropped.
    #[error("transport not connected")]
    NotConnected,

    /// The platform answered the request with an error.
    #[error("platform error ({code}): {description}")]
    Platform {
        /// Platform-specific error code.
        code: i64,
        /// Human readable description returned by the platform.
        description: String,
    },

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// The requested operation is not offered by this transport.
    #[error("operation '{0}' is not supported by this transport")]
    Unsupported(&'static str),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Creates a [`TransportError::Other`] from anything printable.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors raised by persistence collaborators.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// The backing store could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A query or write failed.
    #[error("storage query failed: {0}")]
    Query(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
