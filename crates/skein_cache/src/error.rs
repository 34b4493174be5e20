//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Most cache reads are fail-safe: errors result in cache misses rather
/// than hard failures. This enum surfaces the failures that are reported,
/// chiefly failed writes.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The remote cache failed after all retries.
    #[error("remote cache error: {0}")]
    Remote(#[from] TransportError),
}

/// A failed round trip to the remote cache.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established or was dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The service answered with a non-success status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response: {0}")]
    Decode(String),

    /// The request could not be built or sent for a non-network reason.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Returns `true` for failures worth retrying: timeouts, connection
    /// errors, and 408, 429, or 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Connection(_) => true,
            TransportError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            TransportError::Decode(_) | TransportError::Request(_) => false,
        }
    }
}
