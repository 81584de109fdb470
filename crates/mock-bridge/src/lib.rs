//! Mock bridge capabilities for testing message archival.
//!
//! This crate provides in-memory implementations of the capability traits
//! from `wa-bridge`:
//! - `StaticDirectory` - Contact and group names from fixed maps
//! - `MockDownloader` - Media bytes keyed by URL
//! - `DelayedDownloader` - Wraps another downloader with artificial delay
//!
//! # Example
//!
//! ```rust
//! use mock_bridge::{ChatDirectory, Jid, StaticDirectory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_bridge::BridgeError> {
//!     let alice = Jid::user("15551234567");
//!     let directory = StaticDirectory::new().with_contact(alice.clone(), "Alice Liddell");
//!
//!     let name = directory.contact_full_name(&alice).await?;
//!     assert_eq!(name.as_deref(), Some("Alice Liddell"));
//!     Ok(())
//! }
//! ```

mod delayed;
mod directory;
mod downloader;

// Re-export wa-bridge types for convenience
pub use wa_bridge::{BridgeError, ChatDirectory, Jid, MediaDownloader, MediaKind, MediaRequest};

pub use delayed::DelayedDownloader;
pub use directory::StaticDirectory;
pub use downloader::MockDownloader;
