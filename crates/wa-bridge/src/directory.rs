//! Capabilities the archiver consumes from the messaging client.
//!
//! [`BridgeClient`] implements both traits against the daemon; the
//! `mock-bridge` crate provides in-memory implementations for tests.

use async_trait::async_trait;
use tracing::debug;

use crate::error::BridgeError;
use crate::types::{Jid, MediaRequest};
use crate::BridgeClient;

/// Read-only lookups of contact and group names.
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Full name of a contact from the address book, if known.
    async fn contact_full_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError>;

    /// Current name of a group, if known.
    async fn group_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError>;
}

/// Fetches and decrypts media objects.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    async fn download(&self, request: &MediaRequest) -> Result<Vec<u8>, BridgeError>;
}

#[async_trait]
impl ChatDirectory for BridgeClient {
    async fn contact_full_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError> {
        let contact = self.get_contact(jid).await?;
        if !contact.found {
            debug!("No contact entry for {}", jid);
            return Ok(None);
        }
        Ok(contact.full_name.filter(|n| !n.is_empty()))
    }

    async fn group_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError> {
        let info = self.get_group_info(jid).await?;
        Ok(info.name.filter(|n| !n.is_empty()))
    }
}

#[async_trait]
impl MediaDownloader for BridgeClient {
    async fn download(&self, request: &MediaRequest) -> Result<Vec<u8>, BridgeError> {
        self.download_media(request).await
    }
}

#[async_trait]
impl<T: ChatDirectory + ?Sized> ChatDirectory for std::sync::Arc<T> {
    async fn contact_full_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError> {
        (**self).contact_full_name(jid).await
    }

    async fn group_name(&self, jid: &Jid) -> Result<Option<String>, BridgeError> {
        (**self).group_name(jid).await
    }
}

#[async_trait]
impl<T: MediaDownloader + ?Sized> MediaDownloader for std::sync::Arc<T> {
    async fn download(&self, request: &MediaRequest) -> Result<Vec<u8>, BridgeError> {
        (**self).download(request).await
    }
}
