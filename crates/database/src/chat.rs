//! Chat persistence.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::Chat;

/// Insert a chat or overwrite its name and last message time.
///
/// Last write wins for both columns; callers own write ordering. An empty
/// `display_name` keeps whatever name is already stored.
pub async fn upsert_chat(
    pool: &SqlitePool,
    id: &str,
    display_name: &str,
    last_message_time: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO chats (id, display_name, last_message_time)
        VALUES (?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            display_name = CASE
                WHEN excluded.display_name = '' THEN chats.display_name
                ELSE excluded.display_name
            END,
            last_message_time = excluded.last_message_time
        "#,
    )
    .bind(id)
    .bind(display_name)
    .bind(last_message_time)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a chat by ID.
pub async fn get_chat(pool: &SqlitePool, id: &str) -> Result<Chat> {
    sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, display_name, last_message_time
        FROM chats
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Chat",
        id: id.to_string(),
    })
}

/// Get the stored display name for a chat, if it has a non-empty one.
pub async fn get_chat_name(pool: &SqlitePool, id: &str) -> Result<Option<String>> {
    let name: Option<String> = sqlx::query_scalar(
        r#"
        SELECT display_name
        FROM chats
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(name.filter(|n| !n.is_empty()))
}

/// List all chats, most recently active first.
pub async fn list_chats(pool: &SqlitePool) -> Result<Vec<Chat>> {
    let chats = sqlx::query_as::<_, Chat>(
        r#"
        SELECT id, display_name, last_message_time
        FROM chats
        ORDER BY last_message_time DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(chats)
}
