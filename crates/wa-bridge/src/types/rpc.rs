//! Request and response types for bridge RPC methods.

use serde::{Deserialize, Serialize};

/// Contact entry from the daemon's address book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default)]
    pub found: bool,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub push_name: Option<String>,

    #[serde(default)]
    pub business_name: Option<String>,
}

/// Group metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    pub jid: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub topic: Option<String>,

    #[serde(default)]
    pub participant_count: Option<u32>,
}

/// Kind of media, as the daemon's download method expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

/// Everything needed to fetch and decrypt one media object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    pub kind: MediaKind,

    pub url: String,

    pub direct_path: String,

    #[serde(with = "super::message::base64_bytes")]
    pub media_key: Vec<u8>,

    #[serde(rename = "fileSHA256", with = "super::message::base64_bytes")]
    pub file_sha256: Vec<u8>,

    #[serde(rename = "fileEncSHA256", with = "super::message::base64_bytes")]
    pub file_enc_sha256: Vec<u8>,

    pub file_length: u64,
}

impl MediaRequest {
    /// Whether the descriptor carries everything a download needs.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty()
            && !self.media_key.is_empty()
            && !self.file_sha256.is_empty()
            && !self.file_enc_sha256.is_empty()
            && self.file_length > 0
    }
}

/// Decrypted media returned by the daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadResponse {
    #[serde(with = "super::message::base64_bytes")]
    pub data: Vec<u8>,
}

/// Identity of the paired account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SelfResponse {
    pub jid: String,
}

/// Extract the CDN direct path from a media URL.
///
/// `https://mmg.whatsapp.net/v/t62.7118-24/abc.enc?ccb=11-4` becomes
/// `/v/t62.7118-24/abc.enc`. URLs that do not match are returned unchanged.
pub fn direct_path_from_url(url: &str) -> String {
    let Some((_, path)) = url.split_once(".net/") else {
        return url.to_string();
    };
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    format!("/{}", path)
}
