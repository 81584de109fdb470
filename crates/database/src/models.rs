//! Database models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A conversation, either with an individual or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Chat {
    /// Chat identifier (e.g., "123@s.whatsapp.net" or "456-789@g.us")
    pub id: String,
    /// Resolved display name. Never overwritten with an empty value.
    pub display_name: String,
    /// Time of the most recently stored message for this chat.
    pub last_message_time: DateTime<Utc>,
}

/// Kind of media attached to a message.
///
/// Stored as TEXT; `None` is stored as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    None,
    Image,
    Audio,
    Video,
    Document,
}

impl MediaType {
    /// Column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::None => "",
            MediaType::Image => "image",
            MediaType::Audio => "audio",
            MediaType::Video => "video",
            MediaType::Document => "document",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, MediaType::None)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaType::None => f.write_str("none"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Error returned when a stored media type is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type: {0}")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "none" => Ok(MediaType::None),
            "image" => Ok(MediaType::Image),
            "audio" => Ok(MediaType::Audio),
            "video" => Ok(MediaType::Video),
            "document" => Ok(MediaType::Document),
            other => Err(UnknownMediaType(other.to_string())),
        }
    }
}

impl TryFrom<String> for MediaType {
    type Error = UnknownMediaType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A stored message, keyed by `(id, chat_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Message ID assigned by the messaging network.
    pub id: String,
    /// Chat this message belongs to.
    pub chat_id: String,
    /// Sender user ID, or the chat's local part when unknown.
    pub sender: String,
    /// Text content. May be empty only when media is attached.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Whether the message was sent by the archiving account.
    pub is_outbound: bool,
    #[sqlx(try_from = "String")]
    pub media_type: MediaType,
    pub filename: String,
    pub source_url: String,
    /// Symmetric key needed to decrypt the remote media object.
    pub media_key: Vec<u8>,
    /// SHA-256 of the decrypted media.
    pub content_hash: Vec<u8>,
    /// SHA-256 of the encrypted media.
    pub content_hash_encrypted: Vec<u8>,
    #[sqlx(try_from = "i64")]
    pub content_length: u64,
}

impl Message {
    /// Whether this message carries anything worth storing.
    pub fn is_storable(&self) -> bool {
        !self.content.is_empty() || !self.media_type.is_none()
    }
}

/// Media descriptor of a stored message, sufficient to fetch it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MediaInfo {
    #[sqlx(try_from = "String")]
    pub media_type: MediaType,
    pub filename: String,
    pub source_url: String,
    pub media_key: Vec<u8>,
    pub content_hash: Vec<u8>,
    pub content_hash_encrypted: Vec<u8>,
    #[sqlx(try_from = "i64")]
    pub content_length: u64,
}
