//! Structured error types for alerter
//!
//! Uses thiserror for ergonomic error definitions with automatic Display
//! and Error trait implementations. Every variant resolves to a process
//! exit in `main`; nothing here is retried.

use thiserror::Error;

/// Errors reported by a native notification service adapter
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The notification server could not be reached
    #[error("notification service unavailable: {0}")]
    Unavailable(String),

    /// The server refused a well-formed request
    #[error("notification rejected: {0}")]
    Rejected(String),

    /// Delivery ledger I/O
    #[error("ledger error: {0}")]
    Ledger(#[from] std::io::Error),

    /// Delivery ledger contents could not be decoded
    #[error("ledger is corrupt: {0}")]
    LedgerFormat(#[from] serde_json::Error),
}

/// All possible errors in alerter
#[derive(Error, Debug)]
pub enum AlertError {
    /// Native notification service unreachable at startup
    #[error("Unable to initialize notification system: {0}")]
    Initialization(#[source] ServiceError),

    /// Nothing to deliver (empty message and no list/remove mode)
    #[error("Invalid request: {0}")]
    Validation(&'static str),

    /// The service rejected the notification
    #[error("Failed to deliver notification: {0}")]
    Submission(#[source] ServiceError),

    /// A termination signal arrived while waiting for the outcome
    #[error("Delivery cancelled")]
    Cancelled,

    /// Listing or removal failed
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Reading stdin or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type using AlertError
pub type Result<T> = std::result::Result<T, AlertError>;

impl From<&'static str> for AlertError {
    fn from(s: &'static str) -> Self {
        AlertError::Validation(s)
    }
}

impl AlertError {
    /// Whether the error is reported silently (no diagnostic on stderr)
    pub fn is_silent(&self) -> bool {
        matches!(self, AlertError::Cancelled)
    }
}
