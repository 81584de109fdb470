//! Error types for object storage.

use thiserror::Error;

/// Errors that can occur when talking to an object store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The target bucket does not exist.
    #[error("bucket does not exist: {0}")]
    BucketMissing(String),

    /// The object exceeds the backend's single-request upload limit.
    #[error("object too large for a single upload: {key}")]
    EntityTooLarge { key: String },

    /// A visibility wait gave up.
    #[error("timed out waiting for {key}")]
    Timeout { key: String },

    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type for object store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
