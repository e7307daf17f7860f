//! Partition store error types

use thiserror::Error;

/// Errors from partition storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error (disk-backed store)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry metadata could not be serialized or parsed
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
