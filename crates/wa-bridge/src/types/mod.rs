//! Wire types exchanged with the bridge daemon.

mod event;
mod jid;
mod message;
mod rpc;

pub use event::{
    Conversation, ConversationMeta, Event, HistoryMessage, HistorySync, MessageEvent, MessageInfo,
    MessageKey, WebMessageInfo,
};
pub use jid::{Jid, GROUP_SERVER, USER_SERVER};
pub use message::{
    AudioMessage, DocumentMessage, ExtendedTextMessage, ImageMessage, MediaFields, VideoMessage,
    WaMessage,
};
pub use rpc::{direct_path_from_url, ContactInfo, GroupInfo, MediaKind, MediaRequest};
pub(crate) use rpc::{DownloadResponse, SelfResponse};
