//! Normalization of message payloads into text plus at most one media descriptor.

use chrono::{DateTime, Utc};
use database::{MediaType, Message};
use wa_bridge::{MediaFields, MediaKind, MediaRequest, WaMessage};

/// The single media attachment of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPart {
    Image(MediaFields),
    Video(MediaFields),
    Audio(MediaFields),
    Document(MediaFields),
}

impl MediaPart {
    pub fn media_type(&self) -> MediaType {
        match self {
            MediaPart::Image(_) => MediaType::Image,
            MediaPart::Video(_) => MediaType::Video,
            MediaPart::Audio(_) => MediaType::Audio,
            MediaPart::Document(_) => MediaType::Document,
        }
    }

    pub fn fields(&self) -> &MediaFields {
        match self {
            MediaPart::Image(f) | MediaPart::Video(f) | MediaPart::Audio(f) | MediaPart::Document(f) => f,
        }
    }

    /// Descriptor for downloading this attachment through the bridge.
    pub fn to_request(&self) -> MediaRequest {
        let kind = match self {
            MediaPart::Image(_) => MediaKind::Image,
            MediaPart::Video(_) => MediaKind::Video,
            MediaPart::Audio(_) => MediaKind::Audio,
            MediaPart::Document(_) => MediaKind::Document,
        };
        let fields = self.fields();
        MediaRequest {
            kind,
            url: fields.url.clone(),
            direct_path: fields.direct_path.clone().unwrap_or_default(),
            media_key: fields.media_key.clone(),
            file_sha256: fields.file_sha256.clone(),
            file_enc_sha256: fields.file_enc_sha256.clone(),
            file_length: fields.file_length,
        }
    }
}

/// Normalized content of one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Text body; empty when the message has none.
    pub content: String,
    pub media: Option<MediaPart>,
    /// Archive file name. Empty when there is nothing to store.
    pub filename: String,
}

impl Extracted {
    pub fn media_type(&self) -> MediaType {
        self.media.as_ref().map_or(MediaType::None, MediaPart::media_type)
    }

    /// Whether there is any text or media worth storing.
    pub fn is_storable(&self) -> bool {
        !self.content.is_empty() || self.media.is_some()
    }

    /// Build the row to persist for this content.
    pub fn to_message(
        &self,
        id: &str,
        chat_id: &str,
        sender: &str,
        timestamp: DateTime<Utc>,
        is_outbound: bool,
    ) -> Message {
        let fields = self.media.as_ref().map(MediaPart::fields);
        Message {
            id: id.to_string(),
            chat_id: chat_id.to_string(),
            sender: sender.to_string(),
            content: self.content.clone(),
            timestamp,
            is_outbound,
            media_type: self.media_type(),
            filename: self.filename.clone(),
            source_url: fields.map(|f| f.url.clone()).unwrap_or_default(),
            media_key: fields.map(|f| f.media_key.clone()).unwrap_or_default(),
            content_hash: fields.map(|f| f.file_sha256.clone()).unwrap_or_default(),
            content_hash_encrypted: fields.map(|f| f.file_enc_sha256.clone()).unwrap_or_default(),
            content_length: fields.map_or(0, |f| f.file_length),
        }
    }
}

/// Extract text and media from a payload.
///
/// Text comes from `conversation`, else the extended text. Media is the
/// first of image, video, audio, document that is present. `now` stamps
/// generated file names.
pub fn extract(message: &WaMessage, now: DateTime<Utc>) -> Extracted {
    let content = text_of(message);
    let media = media_of(message);
    let stamp = now.format("%Y%m%d_%H%M%S");

    let filename = match &media {
        Some(MediaPart::Image(_)) => format!("image_{}.jpg", stamp),
        Some(MediaPart::Video(_)) => format!("video_{}.mp4", stamp),
        Some(MediaPart::Audio(_)) => format!("audio_{}.ogg", stamp),
        Some(MediaPart::Document(_)) => message
            .document_message
            .as_ref()
            .and_then(|d| d.file_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("document_{}", stamp)),
        None if !content.is_empty() => format!("text_{}.txt", stamp),
        None => String::new(),
    };

    Extracted {
        content,
        media,
        filename,
    }
}

fn text_of(message: &WaMessage) -> String {
    if let Some(text) = message.conversation.as_deref().filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    message
        .extended_text_message
        .as_ref()
        .and_then(|ext| ext.text.clone())
        .unwrap_or_default()
}

fn media_of(message: &WaMessage) -> Option<MediaPart> {
    if let Some(image) = &message.image_message {
        return Some(MediaPart::Image(image.media.clone()));
    }
    if let Some(video) = &message.video_message {
        return Some(MediaPart::Video(video.media.clone()));
    }
    if let Some(audio) = &message.audio_message {
        return Some(MediaPart::Audio(audio.media.clone()));
    }
    message
        .document_message
        .as_ref()
        .map(|doc| MediaPart::Document(doc.media.clone()))
}
