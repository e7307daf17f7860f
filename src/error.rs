// Crate-level error types

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by lifecycle and configuration code.
///
/// Per-request strategy resolution never produces these: a failed resolution
/// is reported to the caller as a synthetic 503 response, not an error.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Configuration errors (invalid YAML, bad origin URL, etc.)
    #[error("configuration error: {0}")]
    Config(String),

    /// A mandatory pre-warm asset could not be fetched at install time
    #[error("install failed: {0}")]
    Install(String),

    /// Partition storage failure
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}
