//! Message payload types as delivered by the bridge daemon.
//!
//! The daemon forwards the WhatsApp protobuf message as JSON. Only the
//! fields the archiver reads are modelled; everything else is ignored.
//! Binary fields travel as standard base64 strings.

use serde::{Deserialize, Serialize};

/// A WhatsApp message payload.
///
/// At most one of the media sub-messages is normally populated, but the
/// wire format does not enforce it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaMessage {
    /// Plain text message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,

    /// Text with link preview, quote or mentions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_text_message: Option<ExtendedTextMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_message: Option<ImageMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_message: Option<VideoMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_message: Option<AudioMessage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_message: Option<DocumentMessage>,
}

impl WaMessage {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            conversation: Some(text.into()),
            ..Default::default()
        }
    }
}

/// Text message with extras.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedTextMessage {
    #[serde(default)]
    pub text: Option<String>,
}

/// Fields shared by every downloadable media message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFields {
    /// CDN URL of the encrypted media.
    #[serde(default, rename = "URL", alias = "url")]
    pub url: String,

    /// CDN path, when sent separately from the URL.
    #[serde(default)]
    pub direct_path: Option<String>,

    /// Media encryption key.
    #[serde(default, with = "base64_bytes")]
    pub media_key: Vec<u8>,

    /// SHA-256 of the decrypted file.
    #[serde(default, rename = "fileSHA256", alias = "fileSha256", with = "base64_bytes")]
    pub file_sha256: Vec<u8>,

    /// SHA-256 of the encrypted file.
    #[serde(default, rename = "fileEncSHA256", alias = "fileEncSha256", with = "base64_bytes")]
    pub file_enc_sha256: Vec<u8>,

    /// Size of the decrypted file in bytes.
    #[serde(default)]
    pub file_length: u64,

    /// MIME type.
    #[serde(default)]
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    #[serde(flatten)]
    pub media: MediaFields,

    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMessage {
    #[serde(flatten)]
    pub media: MediaFields,

    #[serde(default)]
    pub caption: Option<String>,

    #[serde(default)]
    pub seconds: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMessage {
    #[serde(flatten)]
    pub media: MediaFields,

    #[serde(default)]
    pub seconds: Option<u32>,

    /// Push-to-talk, i.e. a voice note.
    #[serde(default, rename = "PTT", alias = "ptt")]
    pub ptt: bool,

    #[serde(default, with = "base64_bytes")]
    pub waveform: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMessage {
    #[serde(flatten)]
    pub media: MediaFields,

    /// Declared file name.
    #[serde(default)]
    pub file_name: Option<String>,

    #[serde(default)]
    pub title: Option<String>,
}

/// Serde helpers for base64-encoded byte fields. Null and missing decode as empty.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.is_empty() => STANDARD.decode(s).map_err(serde::de::Error::custom),
            _ => Ok(Vec::new()),
        }
    }
}
