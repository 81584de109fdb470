//! Delayed downloader implementation - wraps another downloader with artificial delay.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use wa_bridge::{BridgeError, MediaDownloader, MediaRequest};

/// A downloader that wraps another downloader and adds artificial delay.
///
/// Useful for testing concurrent event handling and slow media servers.
pub struct DelayedDownloader<M: MediaDownloader> {
    inner: M,
    delay: Duration,
}

impl<M: MediaDownloader> DelayedDownloader<M> {
    /// Create a new DelayedDownloader wrapping the given downloader with the specified delay.
    pub fn new(inner: M, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Create a downloader with a delay in milliseconds.
    pub fn with_millis(inner: M, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// The wrapped downloader.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: MediaDownloader> MediaDownloader for DelayedDownloader<M> {
    async fn download(&self, request: &MediaRequest) -> Result<Vec<u8>, BridgeError> {
        sleep(self.delay).await;
        self.inner.download(request).await
    }
}
