//! Events pushed by the bridge daemon.

use serde::{Deserialize, Serialize};

use super::jid::Jid;
use super::message::WaMessage;
use crate::error::BridgeError;

/// An event received from the bridge daemon.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A live message (inbound, or sent from another linked device).
    Message(MessageEvent),
    /// A batch of previously missed conversations.
    HistorySync(HistorySync),
    /// The daemon's session is connected.
    Connected,
    /// The linked device was logged out and must be paired again.
    LoggedOut,
}

impl Event {
    /// Name of the SSE event type carrying this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Message(_) => "message",
            Event::HistorySync(_) => "history_sync",
            Event::Connected => "connected",
            Event::LoggedOut => "logged_out",
        }
    }

    /// Parse an event from its SSE type and JSON data.
    ///
    /// Returns `Ok(None)` for event types this crate does not handle.
    pub fn parse(kind: &str, data: &str) -> Result<Option<Event>, BridgeError> {
        let event = match kind {
            "message" => Event::Message(serde_json::from_str(data)?),
            "history_sync" => Event::HistorySync(serde_json::from_str(data)?),
            "connected" => Event::Connected,
            "logged_out" => Event::LoggedOut,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// A live message with its delivery metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub info: MessageInfo,

    #[serde(default)]
    pub message: WaMessage,
}

/// Delivery metadata of a live message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    /// Message ID.
    pub id: String,

    /// Chat the message belongs to.
    pub chat: Jid,

    /// Author of the message (equals `chat` in direct chats).
    pub sender: Jid,

    /// Unix timestamp in seconds.
    #[serde(default)]
    pub timestamp: i64,

    /// Whether the archiving account sent this message.
    #[serde(default)]
    pub is_from_me: bool,

    /// Sender's self-chosen display name.
    #[serde(default)]
    pub push_name: Option<String>,
}

/// A bulk history backfill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySync {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
}

/// One conversation inside a history sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Chat identifier. Conversations without one are skipped.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

impl Conversation {
    /// The naming metadata carried inline with this conversation.
    pub fn meta(&self) -> ConversationMeta {
        ConversationMeta {
            display_name: self.display_name.clone(),
            name: self.name.clone(),
        }
    }
}

/// Inline naming metadata of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMeta {
    pub display_name: Option<String>,
    pub name: Option<String>,
}

/// Wrapper around a stored message in a history sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    #[serde(default)]
    pub message: Option<WebMessageInfo>,
}

/// A stored message with its key and timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebMessageInfo {
    #[serde(default)]
    pub key: Option<MessageKey>,

    #[serde(default)]
    pub message: Option<WaMessage>,

    /// Unix timestamp in seconds; zero when unknown.
    #[serde(default)]
    pub message_timestamp: u64,
}

/// Identity of a stored message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    #[serde(default)]
    pub remote_jid: Option<String>,

    #[serde(default)]
    pub from_me: Option<bool>,

    #[serde(default)]
    pub id: Option<String>,

    /// Author within a group chat.
    #[serde(default)]
    pub participant: Option<String>,
}
