//! WhatsApp bridge daemon client library.
//!
//! The bridge daemon owns the WhatsApp session (pairing, encryption, media
//! decryption) and exposes it over HTTP. This crate provides:
//!
//! - Typed events received via Server-Sent Events (SSE)
//! - Contact and group lookups over JSON-RPC
//! - Media download with length and SHA-256 verification
//! - The [`ChatDirectory`] and [`MediaDownloader`] capability traits
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use wa_bridge::{BridgeClient, BridgeConfig, Event};
//!
//! # async fn example() -> Result<(), wa_bridge::BridgeError> {
//! let client = BridgeClient::connect(BridgeConfig::default()).await?;
//!
//! let mut events = wa_bridge::subscribe(&client)?;
//! while let Some(result) = events.next().await {
//!     match result {
//!         Ok(Event::Message(msg)) => println!("{} in {}", msg.info.id, msg.info.chat),
//!         Ok(other) => println!("event: {}", other.kind()),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod directory;
pub mod error;
pub mod sse;
pub mod types;

pub use client::{verify_media, BridgeClient};
pub use config::{BridgeConfig, DEFAULT_BASE_URL};
pub use directory::{ChatDirectory, MediaDownloader};
pub use error::BridgeError;
pub use sse::{subscribe, EventStream};
pub use types::*;
