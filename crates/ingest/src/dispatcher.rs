//! Event dispatcher that connects bridge events to storage and archival.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::{chat, message, Database, MediaType};
use futures::{Stream, StreamExt};
use object_store::ObjectStore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use wa_bridge::{
    BridgeError, ChatDirectory, Event, HistoryMessage, HistorySync, Jid, MediaDownloader,
    MessageEvent, MessageKey,
};

use crate::archiver::{Archived, Archiver};
use crate::error::{ArchiveError, DispatchError};
use crate::extract::extract;
use crate::resolver::resolve_chat_name;

/// Configuration for the event dispatcher.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    /// User part of the archiving account's identifier. Used as the sender
    /// of outbound messages replayed by a history sync.
    pub own_user: Option<String>,
}

impl DispatcherConfig {
    /// Create a config with the archiving account's user part.
    pub fn with_own_user(own_user: impl Into<String>) -> Self {
        Self {
            own_user: Some(own_user.into()),
        }
    }
}

/// What happened to a live message that went through the pipeline.
#[derive(Debug)]
pub struct MessageReport {
    pub message_id: String,
    pub chat_id: String,
    pub chat_name: String,
    /// Whether the chat row was written.
    pub chat_stored: bool,
    /// Whether the message row was written.
    pub message_stored: bool,
    pub archive: Result<Archived, ArchiveError>,
}

/// Result of processing a single live message.
#[derive(Debug)]
pub enum ProcessResult {
    /// Message went through storage and archival; see the report for failures.
    Processed(MessageReport),
    /// Message was skipped (e.g., no text, or media outside live scope).
    Skipped { reason: String },
}

/// Counts from one history sync batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum HistoryOutcome {
    Stored,
    Skipped,
    Failed,
}

/// Routes bridge events through extraction, persistence and archival.
///
/// Every event is handled independently. [`EventDispatcher::run`] spawns
/// one task per event, so handlers for different events may interleave.
pub struct EventDispatcher<D, M, S> {
    db: Database,
    directory: D,
    archiver: Archiver<M, S>,
    config: DispatcherConfig,
}

impl<D, M, S> EventDispatcher<D, M, S>
where
    D: ChatDirectory,
    M: MediaDownloader,
    S: ObjectStore,
{
    /// Create a new dispatcher.
    pub fn new(db: Database, directory: D, archiver: Archiver<M, S>, config: DispatcherConfig) -> Self {
        Self {
            db,
            directory,
            archiver,
            config,
        }
    }

    /// Get a reference to the database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Get a reference to the chat directory.
    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Get a reference to the archiver.
    pub fn archiver(&self) -> &Archiver<M, S> {
        &self.archiver
    }

    /// Store and archive one live message.
    ///
    /// Only text and audio are taken from live traffic: media of any other
    /// kind without accompanying text is skipped. Failures of the chat and
    /// message writes are logged and do not stop the archive attempt.
    pub async fn handle_message(&self, event: &MessageEvent) -> ProcessResult {
        let info = &event.info;
        let chat_id = info.chat.to_string();
        let extracted = extract(&event.message, Utc::now());

        if extracted.content.is_empty() && extracted.media_type() != MediaType::Audio {
            let reason = match extracted.media_type() {
                MediaType::None => "no text or media content".to_string(),
                other => format!("{} without text is not archived from live traffic", other),
            };
            debug!(message_id = %info.id, chat_id = %chat_id, "Skipping message: {}", reason);
            return ProcessResult::Skipped { reason };
        }

        // A missing timestamp deserializes as 0
        let timestamp = Some(info.timestamp)
            .filter(|secs| *secs > 0)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now);
        let sender = info.sender.user.clone();
        let pool = self.db.pool();

        let chat_name =
            resolve_chat_name(&self.db, &self.directory, &info.chat, None, Some(&sender)).await;

        let chat_stored = match chat::upsert_chat(pool, &chat_id, &chat_name, timestamp).await {
            Ok(()) => {
                debug!("Updated chat {} with latest timestamp {}", chat_id, timestamp);
                true
            }
            Err(e) => {
                warn!(message_id = %info.id, chat_id = %chat_id, "Failed to store chat: {}", e);
                false
            }
        };

        let row = extracted.to_message(&info.id, &chat_id, &sender, timestamp, info.is_from_me);
        let message_stored = match message::upsert_message(pool, &row).await {
            Ok(stored) => {
                info!(
                    "Stored message {} from {} in chat {} ({})",
                    info.id, sender, chat_id, row.media_type
                );
                stored
            }
            Err(e) => {
                warn!(message_id = %info.id, chat_id = %chat_id, "Failed to store message: {}", e);
                false
            }
        };

        let archive = self.archiver.archive(&chat_id, &info.id, &extracted).await;
        match &archive {
            Ok(archived) if archived.uploaded => {
                info!("Archived message {} to {}", info.id, archived.path)
            }
            Ok(archived) => debug!("Message {} already archived at {}", info.id, archived.path),
            Err(e) => warn!(message_id = %info.id, chat_id = %chat_id, "Failed to archive message: {}", e),
        }

        ProcessResult::Processed(MessageReport {
            message_id: info.id.clone(),
            chat_id,
            chat_name,
            chat_stored,
            message_stored,
            archive,
        })
    }

    /// Store every message of a history sync batch, in delivered order.
    ///
    /// Each stored message also moves its chat's last message time, so the
    /// chat ends up with the time of the last message processed. Nothing is
    /// archived.
    pub async fn handle_history_sync(&self, sync: &HistorySync) -> SyncReport {
        info!("Received history sync with {} conversations", sync.conversations.len());

        let mut report = SyncReport::default();
        for conversation in &sync.conversations {
            let Some(raw_id) = conversation.id.as_deref() else {
                debug!("Skipping conversation without an identifier");
                continue;
            };
            let chat: Jid = match raw_id.parse() {
                Ok(jid) => jid,
                Err(e) => {
                    warn!("Failed to parse chat identifier {}: {}", raw_id, e);
                    continue;
                }
            };

            let meta = conversation.meta();
            let name = resolve_chat_name(&self.db, &self.directory, &chat, Some(&meta), None).await;
            let chat_id = chat.to_string();

            for entry in &conversation.messages {
                match self.store_history_message(&chat, &chat_id, &name, entry).await {
                    HistoryOutcome::Stored => report.stored += 1,
                    HistoryOutcome::Skipped => report.skipped += 1,
                    HistoryOutcome::Failed => report.failed += 1,
                }
            }
        }

        info!(
            "History sync complete. Stored {} messages ({} skipped, {} failed)",
            report.stored, report.skipped, report.failed
        );
        report
    }

    async fn store_history_message(
        &self,
        chat: &Jid,
        chat_id: &str,
        name: &str,
        entry: &HistoryMessage,
    ) -> HistoryOutcome {
        let Some(info) = &entry.message else {
            return HistoryOutcome::Skipped;
        };
        let Some(payload) = &info.message else {
            return HistoryOutcome::Skipped;
        };

        let extracted = extract(payload, Utc::now());
        if !extracted.is_storable() {
            return HistoryOutcome::Skipped;
        }

        let timestamp = match i64::try_from(info.message_timestamp) {
            Ok(secs) if secs > 0 => DateTime::from_timestamp(secs, 0),
            _ => None,
        };
        let Some(timestamp) = timestamp else {
            debug!("Skipping history message in {} without a usable timestamp", chat_id);
            return HistoryOutcome::Skipped;
        };

        let key = info.key.clone().unwrap_or_default();
        let Some(message_id) = key.id.clone().filter(|id| !id.is_empty()) else {
            debug!("Skipping history message in {} without an ID", chat_id);
            return HistoryOutcome::Skipped;
        };
        let is_outbound = key.from_me.unwrap_or(false);
        let sender = self.history_sender(chat, &key, is_outbound);

        let pool = self.db.pool();
        if let Err(e) = chat::upsert_chat(pool, chat_id, name, timestamp).await {
            warn!(message_id = %message_id, chat_id = %chat_id, "Failed to store chat: {}", e);
        }

        let row = extracted.to_message(&message_id, chat_id, &sender, timestamp, is_outbound);
        match message::upsert_message(pool, &row).await {
            Ok(true) => {
                debug!(
                    "Stored history message [{}] {} -> {}: {} {}",
                    timestamp, sender, chat_id, row.media_type, row.content
                );
                HistoryOutcome::Stored
            }
            Ok(false) => HistoryOutcome::Skipped,
            Err(e) => {
                warn!(message_id = %message_id, chat_id = %chat_id, "Failed to store history message: {}", e);
                HistoryOutcome::Failed
            }
        }
    }

    /// Sender of a replayed message: the group participant for inbound
    /// messages, the archiving account for outbound ones, else the chat.
    fn history_sender(&self, chat: &Jid, key: &MessageKey, is_outbound: bool) -> String {
        if is_outbound {
            return self
                .config
                .own_user
                .clone()
                .unwrap_or_else(|| chat.user.clone());
        }

        match key.participant.as_deref().filter(|p| !p.is_empty()) {
            Some(participant) => match participant.parse::<Jid>() {
                Ok(jid) if !jid.user.is_empty() => jid.user,
                _ => participant.to_string(),
            },
            None => chat.user.clone(),
        }
    }

    /// Handle any bridge event.
    pub async fn handle_event(&self, event: Event) {
        match event {
            Event::Message(msg) => match self.handle_message(&msg).await {
                ProcessResult::Processed(report) => {
                    debug!(
                        "Processed message {} in {} (chat stored: {}, message stored: {}, archived: {})",
                        report.message_id,
                        report.chat_id,
                        report.chat_stored,
                        report.message_stored,
                        report.archive.is_ok()
                    );
                }
                ProcessResult::Skipped { reason } => {
                    debug!("Skipped: {}", reason);
                }
            },
            Event::HistorySync(sync) => {
                self.handle_history_sync(&sync).await;
            }
            Event::Connected => info!("Bridge session connected"),
            Event::LoggedOut => warn!("Device logged out, pair the bridge again to resume"),
        }
    }
}

impl<D, M, S> EventDispatcher<D, M, S>
where
    D: ChatDirectory + 'static,
    M: MediaDownloader + 'static,
    S: ObjectStore + 'static,
{
    /// Run the dispatcher until the event stream ends.
    ///
    /// Each event is handled in its own task. In-flight handlers are
    /// awaited before returning.
    pub async fn run<St>(self: Arc<Self>, events: St) -> Result<(), DispatchError>
    where
        St: Stream<Item = Result<Event, BridgeError>> + Unpin,
    {
        self.run_with_shutdown(events, std::future::pending()).await
    }

    /// Run the dispatcher with graceful shutdown support.
    ///
    /// This method runs until either:
    /// - The provided shutdown signal completes
    /// - The event stream ends
    ///
    /// Handlers already started are allowed to finish in both cases.
    pub async fn run_with_shutdown<St, F>(
        self: Arc<Self>,
        mut events: St,
        shutdown_signal: F,
    ) -> Result<(), DispatchError>
    where
        St: Stream<Item = Result<Event, BridgeError>> + Unpin,
        F: Future<Output = ()>,
    {
        info!("Starting event dispatcher (archive bucket: {})", self.archiver.config().bucket);

        let mut handlers = JoinSet::new();
        tokio::pin!(shutdown_signal);

        let result = loop {
            tokio::select! {
                biased;

                () = &mut shutdown_signal => {
                    info!("Shutdown signal received, stopping event dispatcher");
                    break Ok(());
                }

                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = joined {
                        error!("Event handler task failed: {}", e);
                    }
                }

                next = events.next() => {
                    match next {
                        Some(Ok(event)) => {
                            let dispatcher = Arc::clone(&self);
                            handlers.spawn(async move {
                                dispatcher.handle_event(event).await;
                            });
                        }
                        Some(Err(e)) => {
                            error!("Stream error: {}", e);
                        }
                        None => {
                            warn!("Event stream ended");
                            break Err(DispatchError::StreamEnded);
                        }
                    }
                }
            }
        };

        if !handlers.is_empty() {
            info!("Waiting for {} in-flight event handlers", handlers.len());
        }
        while let Some(joined) = handlers.join_next().await {
            if let Err(e) = joined {
                error!("Event handler task failed: {}", e);
            }
        }

        result
    }
}
