//! Message persistence.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{MediaInfo, Message};

/// Insert a message or overwrite every mutable field of an existing one.
///
/// Returns `Ok(false)` without touching the store when the message has no
/// content and no media.
pub async fn upsert_message(pool: &SqlitePool, message: &Message) -> Result<bool> {
    if !message.is_storable() {
        return Ok(false);
    }

    let content_length =
        i64::try_from(message.content_length).map_err(|_| DatabaseError::OutOfRange {
            field: "content_length",
            value: message.content_length,
        })?;

    sqlx::query(
        r#"
        INSERT INTO messages (
            id, chat_id, sender, content, timestamp, is_outbound,
            media_type, filename, source_url, media_key, content_hash,
            content_hash_encrypted, content_length
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (id, chat_id) DO UPDATE SET
            sender = excluded.sender,
            content = excluded.content,
            timestamp = excluded.timestamp,
            is_outbound = excluded.is_outbound,
            media_type = excluded.media_type,
            filename = excluded.filename,
            source_url = excluded.source_url,
            media_key = excluded.media_key,
            content_hash = excluded.content_hash,
            content_hash_encrypted = excluded.content_hash_encrypted,
            content_length = excluded.content_length
        "#,
    )
    .bind(&message.id)
    .bind(&message.chat_id)
    .bind(&message.sender)
    .bind(&message.content)
    .bind(message.timestamp)
    .bind(message.is_outbound)
    .bind(message.media_type.as_str())
    .bind(&message.filename)
    .bind(&message.source_url)
    .bind(&message.media_key)
    .bind(&message.content_hash)
    .bind(&message.content_hash_encrypted)
    .bind(content_length)
    .execute(pool)
    .await?;

    Ok(true)
}

/// Get a message by its composite key.
pub async fn get_message(pool: &SqlitePool, id: &str, chat_id: &str) -> Result<Message> {
    sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, sender, content, timestamp, is_outbound,
               media_type, filename, source_url, media_key, content_hash,
               content_hash_encrypted, content_length
        FROM messages
        WHERE id = ? AND chat_id = ?
        "#,
    )
    .bind(id)
    .bind(chat_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Message",
        id: format!("{}/{}", chat_id, id),
    })
}

/// Get the media descriptor of a stored message.
pub async fn get_media_info(pool: &SqlitePool, id: &str, chat_id: &str) -> Result<MediaInfo> {
    sqlx::query_as::<_, MediaInfo>(
        r#"
        SELECT media_type, filename, source_url, media_key, content_hash,
               content_hash_encrypted, content_length
        FROM messages
        WHERE id = ? AND chat_id = ?
        "#,
    )
    .bind(id)
    .bind(chat_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Message",
        id: format!("{}/{}", chat_id, id),
    })
}

/// List the most recent messages of a chat, newest first.
pub async fn list_messages(pool: &SqlitePool, chat_id: &str, limit: i64) -> Result<Vec<Message>> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT id, chat_id, sender, content, timestamp, is_outbound,
               media_type, filename, source_url, media_key, content_hash,
               content_hash_encrypted, content_length
        FROM messages
        WHERE chat_id = ?
        ORDER BY timestamp DESC
        LIMIT ?
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// Count stored messages for a chat.
pub async fn count_messages(pool: &SqlitePool, chat_id: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM messages
        WHERE chat_id = ?
        "#,
    )
    .bind(chat_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
