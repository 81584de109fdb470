//! Error types for wa-bridge.

use thiserror::Error;

/// Errors that can occur when interacting with the bridge daemon.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON-RPC error response from daemon.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Connection to daemon failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Daemon health check failed.
    #[error("Health check failed")]
    HealthCheckFailed,

    /// SSE stream error.
    #[error("SSE error: {0}")]
    Sse(String),

    /// Malformed chat or user identifier.
    #[error("Invalid JID: {0:?}")]
    InvalidJid(String),

    /// Media descriptor lacks the URL, key, hashes or length.
    #[error("Incomplete media information for download")]
    IncompleteMedia,

    /// Downloaded media does not match its declared length or hash.
    #[error("Media integrity check failed: {0}")]
    Integrity(String),
}
