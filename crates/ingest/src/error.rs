//! Error types for the ingestion pipeline.

use object_store::StoreError;
use thiserror::Error;
use wa_bridge::BridgeError;

/// The input is not an Ogg stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("missing OggS capture pattern")]
    MissingSignature,
}

/// Errors that can occur while archiving a message to the object store.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Neither text nor media to archive.
    #[error("no content or media to archive for message {message_id}")]
    Empty { message_id: String },

    /// The media could not be downloaded or failed verification.
    #[error("failed to fetch media: {0}")]
    MediaFetch(#[source] BridgeError),

    /// The target bucket does not exist.
    #[error("bucket does not exist: {0}")]
    BucketMissing(String),

    /// The object is too large for a single upload.
    #[error("object too large for a single upload: {key}")]
    Oversize { key: String },

    /// Any other storage failure.
    #[error("storage error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for ArchiveError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BucketMissing(bucket) => ArchiveError::BucketMissing(bucket),
            StoreError::EntityTooLarge { key } => ArchiveError::Oversize { key },
            other => ArchiveError::Store(other),
        }
    }
}

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable has an unusable value.
    #[error("invalid {var}: {message}")]
    Invalid { var: String, message: String },
}

/// Errors that stop the event loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Error from the bridge daemon.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// The event stream ended unexpectedly.
    #[error("event stream ended")]
    StreamEnded,
}
