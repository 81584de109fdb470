//! Mock downloader implementation - serves media bytes from memory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use wa_bridge::{BridgeError, MediaDownloader, MediaRequest};

/// A downloader that returns preloaded bytes keyed by media URL.
///
/// Unknown URLs fail the way a missing CDN object would.
#[derive(Debug, Default)]
pub struct MockDownloader {
    media: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
    downloads: AtomicUsize,
}

impl MockDownloader {
    /// Create a downloader with no media.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bytes served for a URL.
    pub fn with_media(self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut media) = self.media.lock() {
            media.insert(url.into(), data.into());
        }
        self
    }

    /// Make every download fail.
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Number of download attempts so far.
    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDownloader for MockDownloader {
    async fn download(&self, request: &MediaRequest) -> Result<Vec<u8>, BridgeError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Connection("media server unavailable".to_string()));
        }
        if !request.is_complete() {
            return Err(BridgeError::IncompleteMedia);
        }

        let media = self
            .media
            .lock()
            .map_err(|_| BridgeError::Connection("downloader lock poisoned".to_string()))?;
        media.get(&request.url).cloned().ok_or_else(|| BridgeError::Rpc {
            code: 404,
            message: format!("no media at {}", request.url),
        })
    }
}
