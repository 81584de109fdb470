//! Archival of message content to an object store.

use std::time::Duration;

use object_store::{ObjectStore, DEFAULT_VISIBILITY_TIMEOUT};
use tracing::{debug, info, warn};
use wa_bridge::MediaDownloader;

use crate::error::ArchiveError;
use crate::extract::{Extracted, MediaPart};
use crate::voice_note::{self, VoiceNote};

/// Where and how to archive.
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    /// Target bucket.
    pub bucket: String,

    /// Wait for each uploaded key to become visible before returning.
    /// A failed wait is logged and does not fail the archive.
    pub wait_for_visibility: bool,

    /// Upper bound for the visibility wait. Default: 60 seconds.
    pub wait_timeout: Duration,
}

impl ArchiverConfig {
    /// Create a config for `bucket` with default wait settings.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            wait_for_visibility: true,
            wait_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }
}

/// Outcome of a successful archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archived {
    /// `<bucket>/<key>`.
    pub path: String,
    /// False when the key already existed and nothing was written.
    pub uploaded: bool,
    /// Duration and waveform, for voice notes that parsed as Ogg.
    pub voice_note: Option<VoiceNote>,
}

/// Object key for a message's content.
pub fn object_key(chat_id: &str, filename: &str) -> String {
    format!("input/{}/{}", chat_id, filename)
}

/// Uploads message text or downloaded media, at most once per key.
pub struct Archiver<M, S> {
    downloader: M,
    store: S,
    config: ArchiverConfig,
}

impl<M: MediaDownloader, S: ObjectStore> Archiver<M, S> {
    pub fn new(downloader: M, store: S, config: ArchiverConfig) -> Self {
        Self {
            downloader,
            store,
            config,
        }
    }

    pub fn downloader(&self) -> &M {
        &self.downloader
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    /// Archive one message's content under `input/<chat_id>/<filename>`.
    ///
    /// Media takes precedence over text. An existing key is treated as
    /// success without uploading. The existence check and the upload are
    /// not atomic: concurrent archives of the same new key may both upload.
    pub async fn archive(
        &self,
        chat_id: &str,
        message_id: &str,
        extracted: &Extracted,
    ) -> Result<Archived, ArchiveError> {
        if !extracted.is_storable() {
            return Err(ArchiveError::Empty {
                message_id: message_id.to_string(),
            });
        }

        let data = match &extracted.media {
            Some(part) => self
                .downloader
                .download(&part.to_request())
                .await
                .map_err(ArchiveError::MediaFetch)?,
            None => extracted.content.as_bytes().to_vec(),
        };

        let voice_note = match &extracted.media {
            Some(MediaPart::Audio(_)) => match voice_note::analyze(&data) {
                Ok(note) => {
                    info!(
                        message_id,
                        "Voice note: {}s, {} waveform samples",
                        note.duration_seconds,
                        note.waveform.len()
                    );
                    Some(note)
                }
                Err(e) => {
                    warn!(message_id, "Audio is not Ogg/Opus: {}", e);
                    None
                }
            },
            _ => None,
        };

        let bucket = self.config.bucket.as_str();
        let key = object_key(chat_id, &extracted.filename);
        let path = format!("{}/{}", bucket, key);

        let existing = self.store.list_keys(bucket, &key).await?;
        if existing.iter().any(|k| *k == key) {
            info!("Object {} already exists in {}, skipping upload", key, bucket);
            return Ok(Archived {
                path,
                uploaded: false,
                voice_note,
            });
        }

        let size = data.len();
        self.store.put_object(bucket, &key, data).await?;
        debug!("Uploaded {} bytes to {} via {}", size, path, self.store.name());

        if self.config.wait_for_visibility {
            if let Err(e) = self
                .store
                .wait_until_exists(bucket, &key, self.config.wait_timeout)
                .await
            {
                warn!("Failed waiting for {} to become visible: {}", path, e);
            }
        }

        Ok(Archived {
            path,
            uploaded: true,
            voice_note,
        })
    }
}
