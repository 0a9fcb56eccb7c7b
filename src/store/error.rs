//! Store error types
//!
//! Defines all errors that can occur talking to the table store.

use thiserror::Error;

/// Errors that can occur in a table store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local SQLite operation failed
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Hosted store could not be reached
    #[error("Store unreachable: {0}")]
    Unreachable(String),

    /// Hosted store answered with a non-success status
    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// No active row (or no row with the requested id)
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single-row query matched more than one row
    #[error("Expected a single row: {0}")]
    Ambiguous(String),

    /// Row could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Store is misconfigured (bad URL, missing key, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection lock was poisoned
    #[error("Lock error: {0}")]
    Lock(String),

    /// I/O failure preparing the store location
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this error means the store itself is unavailable, as opposed
    /// to a missing row or a rejected request
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unreachable(_) | StoreError::Config(_) | StoreError::Lock(_)
        )
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            StoreError::Unreachable(err.to_string())
        } else if err.is_decode() {
            StoreError::Serialization(err.to_string())
        } else {
            StoreError::Unreachable(err.to_string())
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
