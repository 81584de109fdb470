//! Chat display-name resolution.

use database::{chat, Database};
use tracing::debug;
use wa_bridge::{ChatDirectory, ConversationMeta, Jid};

/// Pick a display name for a chat.
///
/// A non-empty stored name always wins, so a chat keeps the first name it
/// was given. Otherwise groups try the inline conversation metadata, then
/// the live group name, then `Group <id>`; individuals try the address
/// book, then `sender_fallback`, then the identifier's local part.
///
/// Lookup failures fall through to the next source. Nothing is persisted.
pub async fn resolve_chat_name<D>(
    db: &Database,
    directory: &D,
    chat: &Jid,
    meta: Option<&ConversationMeta>,
    sender_fallback: Option<&str>,
) -> String
where
    D: ChatDirectory + ?Sized,
{
    let chat_id = chat.to_string();
    match chat::get_chat_name(db.pool(), &chat_id).await {
        Ok(Some(name)) => {
            debug!("Using stored name for {}: {}", chat_id, name);
            return name;
        }
        Ok(None) => {}
        Err(e) => debug!("Stored name lookup failed for {}: {}", chat_id, e),
    }

    if chat.is_group() {
        let inline = meta.and_then(|m| {
            non_empty(m.display_name.as_deref()).or_else(|| non_empty(m.name.as_deref()))
        });
        if let Some(name) = inline {
            return name.to_string();
        }

        match directory.group_name(chat).await {
            Ok(Some(name)) if !name.is_empty() => return name,
            Ok(_) => debug!("No group name for {}", chat_id),
            Err(e) => debug!("Group lookup failed for {}: {}", chat_id, e),
        }
        return format!("Group {}", chat.user);
    }

    match directory.contact_full_name(chat).await {
        Ok(Some(name)) if !name.is_empty() => return name,
        Ok(_) => debug!("No contact name for {}", chat_id),
        Err(e) => debug!("Contact lookup failed for {}: {}", chat_id, e),
    }

    match non_empty(sender_fallback) {
        Some(sender) => sender.to_string(),
        None => chat.user.clone(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
