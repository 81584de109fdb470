//! WhatsApp message ingestion and archival.
//!
//! This crate turns bridge events into stored chats and messages and
//! archives message content to an object store:
//!
//! - [`extract`] - Normalizes a payload into text plus at most one attachment
//! - [`voice_note`] - Reads duration from Ogg/Opus voice notes and builds a waveform
//! - [`resolver`] - Picks a display name for a chat
//! - [`archiver`] - Uploads text or downloaded media, once per key
//! - [`dispatcher`] - Routes live messages and history syncs through the pipeline
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use database::Database;
//! use ingest::{Archiver, ArchiverConfig, DispatcherConfig, EventDispatcher};
//! use object_store::S3Store;
//! use wa_bridge::{BridgeClient, BridgeConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:data/archive.db?mode=rwc").await?;
//! db.migrate().await?;
//!
//! let client = BridgeClient::connect(BridgeConfig::default()).await?;
//! let archiver = Archiver::new(client.clone(), S3Store::from_env().await, ArchiverConfig::new("wa-archive"));
//! let dispatcher = Arc::new(EventDispatcher::new(db, client.clone(), archiver, DispatcherConfig::default()));
//!
//! dispatcher.run(wa_bridge::subscribe(&client)?).await?;
//! # Ok(())
//! # }
//! ```

pub mod archiver;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod resolver;
pub mod voice_note;

pub use archiver::{object_key, Archived, Archiver, ArchiverConfig};
pub use config::IngestConfig;
pub use dispatcher::{DispatcherConfig, EventDispatcher, MessageReport, ProcessResult, SyncReport};
pub use error::{ArchiveError, ConfigError, DispatchError, FormatError};
pub use extract::{extract, Extracted, MediaPart};
pub use resolver::resolve_chat_name;
pub use voice_note::{analyze, synthesize_waveform, VoiceNote};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
