//! Integration tests for the ingest crate
//!
//! These tests drive complete runs against scripted Graph responses and
//! in-memory or temp-dir storage.

use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;
use chrono::{DateTime, Utc};
use ingest::graph::messages_url;
use ingest::testing::{RecordingSleeper, ScriptedTransport, page_json};
use ingest::{
    FileObjectStore, GraphCredentials, HttpResponse, IngestConfig, IngestCoordinator, IngestError,
    InMemoryObjectStore, ObjectStore, StaticToken, TimeWindow,
};
use serde_json::{Value, json};
use tempfile::TempDir;

const BASE: &str = "https://graph.test/v1.0";
const MAILBOX: &str = "ingest@example.com";

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn config() -> IngestConfig {
    let mut config = IngestConfig::new(
        GraphCredentials {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
        },
        MAILBOX,
        "certs",
    );
    config.time_zone = "UTC".into();
    config.cutoff_hour = 6;
    config.graph_base = BASE.into();
    config
}

/// Harness wiring a coordinator to fakes
struct Harness {
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<RecordingSleeper>,
    store: Arc<InMemoryObjectStore>,
    coordinator: IngestCoordinator,
}

impl Harness {
    fn new(config: IngestConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let store = Arc::new(InMemoryObjectStore::new());
        let coordinator = IngestCoordinator::new(
            config,
            transport.clone(),
            Arc::new(StaticToken::new("graph-token")),
            store.clone(),
        )
        .unwrap()
        .with_sleeper(sleeper.clone());

        Self {
            transport,
            sleeper,
            store,
            coordinator,
        }
    }

    fn window(&self) -> TimeWindow {
        self.coordinator.window_at(now()).unwrap()
    }

    fn messages_url(&self) -> String {
        messages_url(BASE, MAILBOX, &self.window()).unwrap()
    }

    fn respond_messages(&self, messages: &[Value]) {
        self.transport.respond(
            self.messages_url(),
            HttpResponse::new(200, page_json(messages, None)),
        );
    }

    fn respond_attachments(&self, message_id: &str, attachments: &[Value]) {
        self.transport.respond(
            attachments_url(message_id),
            HttpResponse::new(200, page_json(attachments, None)),
        );
    }
}

fn attachments_url(message_id: &str) -> String {
    format!(
        "{}/users/ingest%40example.com/messages/{}/attachments?$top=50",
        BASE, message_id
    )
}

fn message(id: &str, subject: &str, received: &str, has_attachments: bool) -> Value {
    json!({
        "id": id,
        "subject": subject,
        "receivedDateTime": received,
        "hasAttachments": has_attachments
    })
}

fn pdf(name: &str, bytes: &[u8]) -> Value {
    json!({
        "@odata.type": "#microsoft.graph.fileAttachment",
        "name": name,
        "contentType": "application/pdf",
        "contentBytes": BASE64_STANDARD.encode(bytes)
    })
}

#[test]
fn test_empty_window_is_a_valid_result() {
    let harness = Harness::new(config());
    harness.respond_messages(&[]);

    let result = harness.coordinator.run(now()).unwrap();

    assert_eq!(result.messages_scanned, 0);
    assert_eq!(result.attachments_saved, 0);
    assert!(result.artifacts.is_empty());
    assert!(harness.store.is_empty());
    assert_eq!(harness.transport.requests().len(), 1);
}

#[test]
fn test_full_run() {
    let cache = TempDir::new().unwrap();
    let mut config = config();
    config.download_dir = Some(cache.path().join("downloads"));
    let harness = Harness::new(config);

    harness.respond_messages(&[
        message("m2", "Survey / annual", "2025-01-15T11:00:00Z", true),
        message("m1", "No files", "2025-01-15T09:00:00Z", false),
    ]);
    harness.respond_attachments(
        "m2",
        &[
            pdf("survey.pdf", b"%PDF-survey"),
            json!({
                "@odata.type": "#microsoft.graph.fileAttachment",
                "name": "photo.jpg",
                "contentType": "image/jpeg",
                "contentBytes": BASE64_STANDARD.encode(b"jpeg")
            }),
        ],
    );

    let result = harness.coordinator.run(now()).unwrap();

    assert_eq!(result.messages_scanned, 2);
    assert_eq!(result.attachments_saved, 1);
    assert_eq!(result.cache_failures, 0);

    let key = "20250115T110000Z__Survey _ annual__survey.pdf";
    assert_eq!(result.artifacts[0].key, key);
    assert_eq!(harness.store.keys(), vec![key.to_string()]);
    let object = harness.store.get(key).unwrap();
    assert_eq!(object.data, b"%PDF-survey");
    assert_eq!(object.content_type, "application/pdf");

    let cached = std::fs::read(cache.path().join("downloads").join(key)).unwrap();
    assert_eq!(cached, b"%PDF-survey");

    // One listing request plus one attachment request; m1 needs none
    assert_eq!(
        harness.transport.requests(),
        vec![
            format!("GET {}", harness.messages_url()),
            format!("GET {}", attachments_url("m2")),
        ]
    );

    let summary = serde_json::to_value(result.summary()).unwrap();
    assert_eq!(summary["artifacts"][0]["size"], 11);
}

#[test]
fn test_colliding_keys_keep_last_write() {
    let harness = Harness::new(config());
    harness.respond_messages(&[message("m1", "Cert", "2025-01-15T10:00:00Z", true)]);
    harness.respond_attachments(
        "m1",
        &[pdf("cert.pdf", b"%PDF-first"), pdf("cert.pdf", b"%PDF-second")],
    );

    let result = harness.coordinator.run(now()).unwrap();

    assert_eq!(result.attachments_saved, 2);
    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.store.put_count(), 2);
    let object = harness.store.get("20250115T100000Z__Cert__cert.pdf").unwrap();
    assert_eq!(object.data, b"%PDF-second");
}

#[test]
fn test_throttled_listing_is_retried() {
    let harness = Harness::new(config());
    harness.transport.respond(
        harness.messages_url(),
        HttpResponse::new(429, "").with_retry_after("4"),
    );
    harness.transport.respond(harness.messages_url(), HttpResponse::new(503, ""));
    harness.respond_messages(&[message("m1", "Cert", "2025-01-15T10:00:00Z", false)]);

    let result = harness.coordinator.run(now()).unwrap();

    assert_eq!(result.messages_scanned, 1);
    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_secs(4), Duration::from_secs(3)]
    );
}

#[test]
fn test_persistent_throttling_ends_the_run() {
    let mut config = config();
    config.retry.max_attempts = 2;
    let harness = Harness::new(config);
    for _ in 0..2 {
        harness.transport.respond(harness.messages_url(), HttpResponse::new(429, ""));
    }

    let err = harness.coordinator.run(now()).unwrap_err();

    assert!(matches!(err, IngestError::RetryExhausted { attempts: 2, .. }));
    assert_eq!(harness.sleeper.sleeps().len(), 1);
}

#[test]
fn test_remote_api_error_aborts_the_run() {
    let harness = Harness::new(config());
    harness.respond_messages(&[message("m1", "Cert", "2025-01-15T10:00:00Z", true)]);
    harness.transport.respond(
        attachments_url("m1"),
        HttpResponse::new(404, r#"{"error":{"code":"ErrorItemNotFound"}}"#),
    );

    let err = harness.coordinator.run(now()).unwrap_err();

    match err {
        IngestError::RemoteApi { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("ErrorItemNotFound"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_storage_failure_aborts_the_run() {
    let harness = Harness::new(config());
    harness.respond_messages(&[
        message("m2", "Second", "2025-01-15T11:00:00Z", true),
        message("m1", "First", "2025-01-15T10:00:00Z", true),
    ]);
    harness.respond_attachments("m2", &[pdf("a.pdf", b"%PDF-a")]);
    harness.respond_attachments("m1", &[pdf("b.pdf", b"%PDF-b")]);
    harness.store.fail_on("20250115T110000Z__Second__a.pdf");

    let err = harness.coordinator.run(now()).unwrap_err();

    assert!(matches!(err, IngestError::Storage { .. }));
    assert!(harness.store.is_empty());
    // m1 was never reached
    assert!(
        !harness
            .transport
            .requests()
            .contains(&format!("GET {}", attachments_url("m1")))
    );
}

#[test]
fn test_undecodable_attachment_is_skipped() {
    let harness = Harness::new(config());
    harness.respond_messages(&[message("m1", "Cert", "2025-01-15T10:00:00Z", true)]);
    harness.respond_attachments(
        "m1",
        &[
            json!({
                "@odata.type": "#microsoft.graph.fileAttachment",
                "name": "broken.pdf",
                "contentBytes": "%%%"
            }),
            pdf("ok.pdf", b"%PDF-ok"),
        ],
    );

    let result = harness.coordinator.run(now()).unwrap();

    assert_eq!(result.attachments_saved, 1);
    assert_eq!(result.attachments_failed, 1);
}

#[test]
fn test_runs_are_independent() {
    let harness = Harness::new(config());
    harness.respond_messages(&[message("m1", "Cert", "2025-01-15T10:00:00Z", true)]);
    harness.respond_attachments("m1", &[pdf("cert.pdf", b"%PDF")]);
    harness.respond_messages(&[message("m1", "Cert", "2025-01-15T10:00:00Z", true)]);
    harness.respond_attachments("m1", &[pdf("cert.pdf", b"%PDF")]);

    let first = harness.coordinator.run(now()).unwrap();
    let second = harness.coordinator.run(now()).unwrap();

    // No ingestion history: the same message is processed again
    assert_eq!(first.attachments_saved, 1);
    assert_eq!(second.attachments_saved, 1);
    assert_eq!(harness.store.put_count(), 2);
}

#[test]
fn test_preflight_rejects_missing_storage_directory() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileObjectStore::new(dir.path().join("missing")));
    let coordinator = IngestCoordinator::new(
        config(),
        Arc::new(ScriptedTransport::new()),
        Arc::new(StaticToken::new("t")),
        store,
    )
    .unwrap();

    assert!(matches!(
        coordinator.preflight(),
        Err(IngestError::Configuration(_))
    ));
}

#[test]
fn test_file_store_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileObjectStore::new(dir.path()));
    store.check_access().unwrap();

    let transport = Arc::new(ScriptedTransport::new());
    let coordinator = IngestCoordinator::new(
        config(),
        transport.clone(),
        Arc::new(StaticToken::new("t")),
        store,
    )
    .unwrap()
    .with_sleeper(Arc::new(RecordingSleeper::new()));

    let window = coordinator.window_at(now()).unwrap();
    transport.respond(
        messages_url(BASE, MAILBOX, &window).unwrap(),
        HttpResponse::new(
            200,
            page_json(&[message("m1", "Cert", "2025-01-15T10:00:00Z", true)], None),
        ),
    );
    transport.respond(
        attachments_url("m1"),
        HttpResponse::new(200, page_json(&[pdf("cert.pdf", b"%PDF-file")], None)),
    );

    coordinator.run(now()).unwrap();

    let stored = std::fs::read(dir.path().join("20250115T100000Z__Cert__cert.pdf")).unwrap();
    assert_eq!(stored, b"%PDF-file");
}
