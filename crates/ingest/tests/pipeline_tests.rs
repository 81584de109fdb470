//! End-to-end tests of the ingestion pipeline against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use database::{chat, message, Database, MediaType};
use futures::StreamExt;
use ingest::{
    extract, Archiver, ArchiverConfig, DispatchError, DispatcherConfig, EventDispatcher,
    ArchiveError, ProcessResult, SyncReport,
};
use mock_bridge::{DelayedDownloader, MockDownloader, StaticDirectory};
use object_store::{MemoryStore, ObjectStore};
use wa_bridge::{
    AudioMessage, Conversation, Event, HistoryMessage, HistorySync, ImageMessage, Jid, MediaFields,
    MessageEvent, MessageInfo, MessageKey, WaMessage, WebMessageInfo,
};

const BUCKET: &str = "wa-archive";

type TestDispatcher =
    EventDispatcher<Arc<StaticDirectory>, Arc<DelayedDownloader<MockDownloader>>, Arc<MemoryStore>>;

struct Harness {
    dispatcher: Arc<TestDispatcher>,
    directory: Arc<StaticDirectory>,
    store: Arc<MemoryStore>,
}

impl Harness {
    async fn new(directory: StaticDirectory, downloader: MockDownloader) -> Self {
        Self::with_config(directory, downloader, DispatcherConfig::default()).await
    }

    async fn with_config(
        directory: StaticDirectory,
        downloader: MockDownloader,
        config: DispatcherConfig,
    ) -> Self {
        Self::build(directory, DelayedDownloader::new(downloader, Duration::ZERO), config).await
    }

    /// Harness whose media downloads take `delay` to complete.
    async fn with_download_delay(
        directory: StaticDirectory,
        downloader: MockDownloader,
        delay: Duration,
    ) -> Self {
        Self::build(directory, DelayedDownloader::new(downloader, delay), DispatcherConfig::default()).await
    }

    async fn build(
        directory: StaticDirectory,
        downloader: DelayedDownloader<MockDownloader>,
        config: DispatcherConfig,
    ) -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();

        let directory = Arc::new(directory);
        let store = Arc::new(MemoryStore::with_bucket(BUCKET));
        let archiver = Archiver::new(Arc::new(downloader), store.clone(), ArchiverConfig::new(BUCKET));
        let dispatcher = Arc::new(EventDispatcher::new(db, directory.clone(), archiver, config));

        Self {
            dispatcher,
            directory,
            store,
        }
    }

    fn db(&self) -> &Database {
        self.dispatcher.database()
    }

    async fn keys(&self, prefix: &str) -> Vec<String> {
        self.store.list_keys(BUCKET, prefix).await.unwrap()
    }
}

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn live(id: &str, chat: &str, sender: &str, timestamp: i64, message: WaMessage) -> MessageEvent {
    MessageEvent {
        info: MessageInfo {
            id: id.to_string(),
            chat: chat.parse().unwrap(),
            sender: sender.parse().unwrap(),
            timestamp,
            is_from_me: false,
            push_name: None,
        },
        message,
    }
}

fn media(url: &str, length: u64) -> MediaFields {
    MediaFields {
        url: url.to_string(),
        media_key: vec![1; 32],
        file_sha256: vec![2; 32],
        file_enc_sha256: vec![3; 32],
        file_length: length,
        ..Default::default()
    }
}

fn history(id: &str, timestamp: u64, key: MessageKey, message: WaMessage) -> HistoryMessage {
    HistoryMessage {
        message: Some(WebMessageInfo {
            key: Some(MessageKey {
                id: Some(id.to_string()),
                ..key
            }),
            message: Some(message),
            message_timestamp: timestamp,
        }),
    }
}

/// Minimal Ogg/Opus stream: identification header page plus one audio page.
fn ogg_voice_note(seconds: u64) -> Vec<u8> {
    fn page(sequence: u32, granule: u64, body: &[u8]) -> Vec<u8> {
        let mut out = b"OggS".to_vec();
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&granule.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&sequence.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.push(1);
        out.push(body.len() as u8);
        out.extend_from_slice(body);
        out
    }

    let mut head = b"OpusHead".to_vec();
    head.extend_from_slice(&[1, 1]);
    head.extend_from_slice(&0u16.to_le_bytes());
    head.extend_from_slice(&48_000u32.to_le_bytes());
    head.extend_from_slice(&[0, 0, 0]);

    let mut data = page(0, 0, &head);
    data.extend(page(2, seconds * 48_000, &[0u8; 64]));
    data
}

// ============================================================================
// Live messages
// ============================================================================

#[tokio::test]
async fn live_text_message_is_stored_and_archived() {
    let alice = Jid::user("123");
    let harness = Harness::new(
        StaticDirectory::new().with_contact(alice, "Alice Liddell"),
        MockDownloader::new(),
    )
    .await;

    let event = live("M1", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, WaMessage::text("hello"));
    let ProcessResult::Processed(report) = harness.dispatcher.handle_message(&event).await else {
        panic!("text message should be processed");
    };
    assert!(report.chat_stored);
    assert!(report.message_stored);

    let pool = harness.db().pool();
    let stored_chat = chat::get_chat(pool, "123@s.whatsapp.net").await.unwrap();
    assert_eq!(stored_chat.display_name, "Alice Liddell");
    assert_eq!(stored_chat.last_message_time, ts(1_700_000_000));

    let stored = message::get_message(pool, "M1", "123@s.whatsapp.net").await.unwrap();
    assert_eq!(stored.content, "hello");
    assert_eq!(stored.sender, "123");
    assert_eq!(stored.media_type, MediaType::None);
    assert!(stored.filename.starts_with("text_") && stored.filename.ends_with(".txt"));

    let key = format!("input/123@s.whatsapp.net/{}", stored.filename);
    assert_eq!(harness.keys("input/123@s.whatsapp.net/").await, vec![key.clone()]);
    assert_eq!(harness.store.get_object(BUCKET, &key).unwrap(), b"hello");

    let archived = report.archive.unwrap();
    assert!(archived.uploaded);
    assert_eq!(archived.path, format!("{}/{}", BUCKET, key));
}

#[tokio::test]
async fn live_image_without_text_is_not_stored() {
    let harness = Harness::new(
        StaticDirectory::new(),
        MockDownloader::new().with_media("https://cdn/img", b"jpeg".to_vec()),
    )
    .await;

    let message = WaMessage {
        image_message: Some(ImageMessage {
            media: media("https://cdn/img", 4),
            caption: None,
        }),
        ..Default::default()
    };
    let event = live("M2", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, message);

    let result = harness.dispatcher.handle_message(&event).await;
    assert!(matches!(result, ProcessResult::Skipped { .. }));

    let pool = harness.db().pool();
    assert!(message::get_message(pool, "M2", "123@s.whatsapp.net").await.is_err());
    assert!(chat::get_chat(pool, "123@s.whatsapp.net").await.is_err());
    assert!(harness.keys("").await.is_empty());
}

#[tokio::test]
async fn live_empty_message_is_skipped() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;
    let event = live("M0", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, WaMessage::default());
    assert!(matches!(
        harness.dispatcher.handle_message(&event).await,
        ProcessResult::Skipped { .. }
    ));
}

#[tokio::test]
async fn live_voice_note_is_stored_archived_and_analyzed() {
    let voice = ogg_voice_note(4);
    let harness = Harness::new(
        StaticDirectory::new(),
        MockDownloader::new().with_media("https://cdn/voice", voice.clone()),
    )
    .await;

    let message = WaMessage {
        audio_message: Some(AudioMessage {
            media: media("https://cdn/voice", voice.len() as u64),
            seconds: Some(4),
            ptt: true,
            waveform: Vec::new(),
        }),
        ..Default::default()
    };
    let event = live("V1", "555-1@g.us", "777@s.whatsapp.net", 1_700_000_500, message);

    let ProcessResult::Processed(report) = harness.dispatcher.handle_message(&event).await else {
        panic!("voice note should be processed");
    };
    assert_eq!(report.chat_name, "Group 555-1");

    let stored = message::get_message(harness.db().pool(), "V1", "555-1@g.us").await.unwrap();
    assert_eq!(stored.media_type, MediaType::Audio);
    assert!(stored.content.is_empty());
    assert_eq!(stored.sender, "777");
    assert_eq!(stored.source_url, "https://cdn/voice");
    assert_eq!(stored.content_length, voice.len() as u64);

    let archived = report.archive.unwrap();
    let key = format!("input/555-1@g.us/{}", stored.filename);
    assert_eq!(harness.store.get_object(BUCKET, &key).unwrap(), voice);
    assert_eq!(archived.voice_note.unwrap().duration_seconds, 4);
}

#[tokio::test]
async fn unreachable_media_keeps_stored_row() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let message = WaMessage {
        audio_message: Some(AudioMessage {
            media: media("https://cdn/expired", 4096),
            seconds: Some(3),
            ptt: true,
            waveform: Vec::new(),
        }),
        ..Default::default()
    };
    let event = live("V2", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_600, message);

    let ProcessResult::Processed(report) = harness.dispatcher.handle_message(&event).await else {
        panic!("voice note should be processed");
    };
    assert!(report.chat_stored);
    assert!(report.message_stored);
    assert!(matches!(report.archive, Err(ArchiveError::MediaFetch(_))));

    let stored = message::get_message(harness.db().pool(), "V2", "123@s.whatsapp.net").await.unwrap();
    assert_eq!(stored.media_type, MediaType::Audio);
    assert_eq!(stored.source_url, "https://cdn/expired");
    assert_eq!(stored.content_length, 4096);
    assert!(harness.keys("").await.is_empty());
}

#[tokio::test]
async fn live_message_without_timestamp_uses_receive_time() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;
    let before = Utc::now();

    let event = live("T0", "123@s.whatsapp.net", "123@s.whatsapp.net", 0, WaMessage::text("no clock"));
    assert!(matches!(
        harness.dispatcher.handle_message(&event).await,
        ProcessResult::Processed(_)
    ));

    let stored = message::get_message(harness.db().pool(), "T0", "123@s.whatsapp.net").await.unwrap();
    assert!(stored.timestamp >= before - chrono::Duration::seconds(1));
}

#[tokio::test]
async fn failed_message_write_still_archives() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;
    sqlx::query("DROP TABLE messages")
        .execute(harness.db().pool())
        .await
        .unwrap();

    let event = live("M3", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, WaMessage::text("still archived"));
    let ProcessResult::Processed(report) = harness.dispatcher.handle_message(&event).await else {
        panic!("text message should be processed");
    };

    assert!(report.chat_stored);
    assert!(!report.message_stored);
    assert!(report.archive.unwrap().uploaded);
    assert_eq!(harness.keys("input/123@s.whatsapp.net/").await.len(), 1);
}

#[tokio::test]
async fn redelivered_message_is_idempotent() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;
    let event = live("M4", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, WaMessage::text("once"));

    harness.dispatcher.handle_message(&event).await;
    harness.dispatcher.handle_message(&event).await;

    let pool = harness.db().pool();
    assert_eq!(message::count_messages(pool, "123@s.whatsapp.net").await.unwrap(), 1);
    assert_eq!(chat::list_chats(pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn stored_chat_name_is_sticky() {
    let alice = Jid::user("123");
    let harness = Harness::new(
        StaticDirectory::new().with_contact(alice.clone(), "Alice"),
        MockDownloader::new(),
    )
    .await;

    let first = live("S1", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, WaMessage::text("one"));
    harness.dispatcher.handle_message(&first).await;

    harness.directory.set_contact(alice, "Alicia");
    let second = live("S2", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_100, WaMessage::text("two"));
    let ProcessResult::Processed(report) = harness.dispatcher.handle_message(&second).await else {
        panic!("text message should be processed");
    };

    assert_eq!(report.chat_name, "Alice");
    let stored = chat::get_chat(harness.db().pool(), "123@s.whatsapp.net").await.unwrap();
    assert_eq!(stored.display_name, "Alice");
    assert_eq!(stored.last_message_time, ts(1_700_000_100));
}

// ============================================================================
// History sync
// ============================================================================

#[tokio::test]
async fn history_sync_tracks_last_processed_timestamp() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let sync = HistorySync {
        conversations: vec![
            Conversation {
                id: Some("123@s.whatsapp.net".to_string()),
                messages: vec![
                    history("H1", 1_700_000_001, MessageKey::default(), WaMessage::text("first")),
                    history("H2", 1_700_000_002, MessageKey::default(), WaMessage::text("second")),
                    history("H3", 1_700_000_003, MessageKey::default(), WaMessage::text("third")),
                ],
                ..Default::default()
            },
            Conversation {
                id: Some("555-1@g.us".to_string()),
                display_name: Some("Book Club".to_string()),
                ..Default::default()
            },
        ],
    };

    let report = harness.dispatcher.handle_history_sync(&sync).await;
    assert_eq!(
        report,
        SyncReport {
            stored: 3,
            skipped: 0,
            failed: 0
        }
    );

    let pool = harness.db().pool();
    let stored = chat::get_chat(pool, "123@s.whatsapp.net").await.unwrap();
    assert_eq!(stored.last_message_time, ts(1_700_000_003));
    assert_eq!(stored.display_name, "123");
    assert_eq!(message::count_messages(pool, "123@s.whatsapp.net").await.unwrap(), 3);

    // Backfill never archives
    assert!(harness.keys("").await.is_empty());
}

#[tokio::test]
async fn history_sync_follows_delivery_order() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let sync = HistorySync {
        conversations: vec![Conversation {
            id: Some("123@s.whatsapp.net".to_string()),
            messages: vec![
                history("N3", 1_700_000_003, MessageKey::default(), WaMessage::text("newest")),
                history("N1", 1_700_000_001, MessageKey::default(), WaMessage::text("oldest")),
            ],
            ..Default::default()
        }],
    };
    harness.dispatcher.handle_history_sync(&sync).await;

    let stored = chat::get_chat(harness.db().pool(), "123@s.whatsapp.net").await.unwrap();
    assert_eq!(stored.last_message_time, ts(1_700_000_001));
}

#[tokio::test]
async fn history_sync_skips_unusable_entries() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let sync = HistorySync {
        conversations: vec![
            Conversation {
                id: None,
                messages: vec![history("X1", 1_700_000_000, MessageKey::default(), WaMessage::text("lost"))],
                ..Default::default()
            },
            Conversation {
                id: Some("".to_string()),
                ..Default::default()
            },
            Conversation {
                id: Some("123@s.whatsapp.net".to_string()),
                messages: vec![
                    HistoryMessage::default(),
                    history("E1", 1_700_000_000, MessageKey::default(), WaMessage::default()),
                    history("Z1", 0, MessageKey::default(), WaMessage::text("no time")),
                    history("", 1_700_000_000, MessageKey::default(), WaMessage::text("no id")),
                    history("OK", 1_700_000_000, MessageKey::default(), WaMessage::text("kept")),
                ],
                ..Default::default()
            },
        ],
    };

    let report = harness.dispatcher.handle_history_sync(&sync).await;
    assert_eq!(report.stored, 1);
    assert_eq!(report.skipped, 4);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn history_sync_stores_non_audio_media() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let message = WaMessage {
        image_message: Some(ImageMessage {
            media: media("https://cdn/old-img", 2048),
            caption: None,
        }),
        ..Default::default()
    };
    let sync = HistorySync {
        conversations: vec![Conversation {
            id: Some("123@s.whatsapp.net".to_string()),
            messages: vec![history("I1", 1_700_000_000, MessageKey::default(), message)],
            ..Default::default()
        }],
    };

    assert_eq!(harness.dispatcher.handle_history_sync(&sync).await.stored, 1);

    let info = message::get_media_info(harness.db().pool(), "I1", "123@s.whatsapp.net")
        .await
        .unwrap();
    assert_eq!(info.media_type, MediaType::Image);
    assert_eq!(info.source_url, "https://cdn/old-img");
    assert_eq!(info.content_length, 2048);
}

#[tokio::test]
async fn history_sync_derives_senders() {
    let harness = Harness::with_config(
        StaticDirectory::new(),
        MockDownloader::new(),
        DispatcherConfig::with_own_user("999"),
    )
    .await;

    let inbound_participant = MessageKey {
        from_me: Some(false),
        participant: Some("777@s.whatsapp.net".to_string()),
        ..Default::default()
    };
    let outbound = MessageKey {
        from_me: Some(true),
        participant: Some("777@s.whatsapp.net".to_string()),
        ..Default::default()
    };

    let sync = HistorySync {
        conversations: vec![Conversation {
            id: Some("555-1@g.us".to_string()),
            name: Some("Book Club".to_string()),
            messages: vec![
                history("P1", 1_700_000_001, inbound_participant, WaMessage::text("from member")),
                history("P2", 1_700_000_002, outbound, WaMessage::text("from me")),
                history("P3", 1_700_000_003, MessageKey::default(), WaMessage::text("unknown")),
            ],
            ..Default::default()
        }],
    };
    harness.dispatcher.handle_history_sync(&sync).await;

    let pool = harness.db().pool();
    let p1 = message::get_message(pool, "P1", "555-1@g.us").await.unwrap();
    let p2 = message::get_message(pool, "P2", "555-1@g.us").await.unwrap();
    let p3 = message::get_message(pool, "P3", "555-1@g.us").await.unwrap();
    assert_eq!((p1.sender.as_str(), p1.is_outbound), ("777", false));
    assert_eq!((p2.sender.as_str(), p2.is_outbound), ("999", true));
    assert_eq!(p3.sender, "555-1");

    let stored = chat::get_chat(pool, "555-1@g.us").await.unwrap();
    assert_eq!(stored.display_name, "Book Club");
}

// ============================================================================
// Archival races and the event loop
// ============================================================================

#[tokio::test]
async fn concurrent_uploads_of_same_key_leave_one_object() {
    let store = Arc::new(MemoryStore::with_bucket(BUCKET).with_put_delay(Duration::from_millis(50)));
    let archiver = Arc::new(Archiver::new(
        MockDownloader::new(),
        store.clone(),
        ArchiverConfig::new(BUCKET),
    ));

    let now = Utc::now();
    let first = extract(&WaMessage::text("from first"), now);
    let second = extract(&WaMessage::text("from second"), now);
    assert_eq!(first.filename, second.filename);

    let (a, b) = tokio::join!(
        archiver.archive("123@s.whatsapp.net", "R1", &first),
        archiver.archive("123@s.whatsapp.net", "R2", &second),
    );

    // Both passed the existence check before either wrote
    assert!(a.unwrap().uploaded);
    assert!(b.unwrap().uploaded);
    assert_eq!(store.put_count(), 2);
    assert_eq!(store.object_count(BUCKET), 1);

    let key = format!("input/123@s.whatsapp.net/{}", first.filename);
    let content = store.get_object(BUCKET, &key).unwrap();
    assert!(content == b"from first" || content == b"from second");
}

#[tokio::test]
async fn run_handles_every_event_until_stream_ends() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let events = vec![
        Ok(Event::Connected),
        Ok(Event::Message(live("R1", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_000, WaMessage::text("one")))),
        Err(wa_bridge::BridgeError::Sse("transient".to_string())),
        Ok(Event::Message(live("R2", "456@s.whatsapp.net", "456@s.whatsapp.net", 1_700_000_001, WaMessage::text("two")))),
        Ok(Event::HistorySync(HistorySync {
            conversations: vec![Conversation {
                id: Some("789@s.whatsapp.net".to_string()),
                messages: vec![history("R3", 1_700_000_002, MessageKey::default(), WaMessage::text("three"))],
                ..Default::default()
            }],
        })),
        Ok(Event::LoggedOut),
    ];

    let result = harness
        .dispatcher
        .clone()
        .run(futures::stream::iter(events))
        .await;
    assert!(matches!(result, Err(DispatchError::StreamEnded)));

    let chats = chat::list_chats(harness.db().pool()).await.unwrap();
    assert_eq!(chats.len(), 3);
    assert_eq!(harness.keys("input/").await.len(), 2);
}

#[tokio::test]
async fn run_with_shutdown_stops_on_signal() {
    let harness = Harness::new(StaticDirectory::new(), MockDownloader::new()).await;

    let result = harness
        .dispatcher
        .clone()
        .run_with_shutdown(futures::stream::pending(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        })
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_archives() {
    let voice = ogg_voice_note(2);
    let harness = Harness::with_download_delay(
        StaticDirectory::new(),
        MockDownloader::new().with_media("https://cdn/slow", voice.clone()),
        Duration::from_millis(150),
    )
    .await;

    let message = WaMessage {
        audio_message: Some(AudioMessage {
            media: media("https://cdn/slow", voice.len() as u64),
            seconds: Some(2),
            ptt: true,
            waveform: Vec::new(),
        }),
        ..Default::default()
    };
    let event = live("S1", "123@s.whatsapp.net", "123@s.whatsapp.net", 1_700_000_700, message);
    let events = futures::stream::iter(vec![Ok::<_, wa_bridge::BridgeError>(Event::Message(event))])
        .chain(futures::stream::pending());

    let result = harness
        .dispatcher
        .clone()
        .run_with_shutdown(events, async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        })
        .await;
    assert!(result.is_ok());

    // The download outlasted the shutdown signal but was not abandoned
    let keys = harness.keys("input/123@s.whatsapp.net/").await;
    assert_eq!(keys.len(), 1);
    assert_eq!(harness.store.get_object(BUCKET, &keys[0]).unwrap(), voice);
}
