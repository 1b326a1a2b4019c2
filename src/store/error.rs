//! Error types for record store operations.

use thiserror::Error;

/// Errors raised while talking to the record store.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Network connectivity error (DNS, connection refused, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured deadline.
    #[error("Request timeout after {0}s")]
    Timeout(u64),

    /// Store answered with a non-2xx status.
    #[error("Record store error {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Response body did not match the documented shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be constructed.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            StoreError::Timeout(timeout_secs)
        } else if error.is_decode() {
            StoreError::InvalidResponse(error.to_string())
        } else {
            StoreError::Network(error.to_string())
        }
    }
}
