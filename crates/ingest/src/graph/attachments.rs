//! PDF attachment extraction
//!
//! Pages through a message's attachments, keeps inline PDF file attachments
//! and turns each into an [`OutputArtifact`] with a deterministic key. A bad
//! entry only costs that entry; paging failures abort the caller's run.

use base64::prelude::*;
use log::{debug, warn};
use serde_json::Value;

use super::api::{FILE_ATTACHMENT, GraphAttachment};
use super::pager::PagedFetcher;
use crate::error::Result;
use crate::models::{
    AttachmentRecord, MessageId, MessageSummary, OutputArtifact, PDF_CONTENT_TYPE,
};

/// Attachments requested per page
const PAGE_SIZE: usize = 50;

/// Maximum characters of the subject kept in a key
const SUBJECT_KEY_CHARS: usize = 80;

/// Filename used when Graph reports none
const DEFAULT_NAME: &str = "attachment";

/// Artifacts pulled from one message
#[derive(Debug, Default)]
pub struct Extraction {
    pub artifacts: Vec<OutputArtifact>,
    /// Entries that were malformed or failed to decode
    pub failed: usize,
}

/// PDF if the declared type is `application/pdf` or the name ends in `.pdf`
pub fn is_pdf(name: &str, content_type: &str) -> bool {
    content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE)
        || name.to_ascii_lowercase().ends_with(".pdf")
}

/// Build the storage key for an attachment of `message`.
///
/// Format: `{received yyyymmddTHHMMSSZ}__{subject}__{filename}`. The subject
/// is trimmed, has `/` replaced and is cut to 80 characters. Identical
/// inputs give identical keys; the later upload wins.
pub fn derive_key(message: &MessageSummary, filename: &str) -> String {
    let stamp = message.received_at.format("%Y%m%dT%H%M%SZ");
    let subject: String = message
        .subject
        .trim()
        .replace('/', "_")
        .chars()
        .take(SUBJECT_KEY_CHARS)
        .collect();
    let name = filename.replace(['/', '\\'], "_");

    format!("{}__{}__{}", stamp, subject, name)
}

fn attachments_url(base: &str, mailbox: &str, id: &MessageId) -> String {
    format!(
        "{}/users/{}/messages/{}/attachments?$top={}",
        base,
        urlencoding::encode(mailbox),
        urlencoding::encode(id.as_str()),
        PAGE_SIZE
    )
}

/// Turn one raw attachment entry into a PDF record.
///
/// `Ok(None)` means the entry is out of scope (not a file, not a PDF, no
/// inline bytes); `Err` means it looked like a PDF but could not be read.
fn decode_entry(entry: Value) -> std::result::Result<Option<AttachmentRecord>, String> {
    let attachment: GraphAttachment =
        serde_json::from_value(entry).map_err(|e| format!("malformed entry: {}", e))?;

    if attachment.odata_type.as_deref() != Some(FILE_ATTACHMENT) {
        debug!(
            "Skipping non-file attachment {:?} ({:?})",
            attachment.name, attachment.odata_type
        );
        return Ok(None);
    }

    let name = attachment
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_NAME.to_string());
    let content_type = attachment.content_type.unwrap_or_default();

    if !is_pdf(&name, &content_type) {
        return Ok(None);
    }

    let Some(encoded) = attachment.content_bytes.filter(|c| !c.is_empty()) else {
        debug!("Skipping {} without inline content", name);
        return Ok(None);
    };

    let payload = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("{}: invalid base64: {}", name, e))?;

    Ok(Some(AttachmentRecord {
        name,
        content_type,
        payload,
        is_pdf: true,
    }))
}

/// Extract every PDF attachment of `message`.
///
/// Messages without attachments return immediately without a request.
pub fn extract(
    fetcher: &PagedFetcher,
    base: &str,
    mailbox: &str,
    message: &MessageSummary,
) -> Result<Extraction> {
    let mut extraction = Extraction::default();
    if !message.has_attachments {
        return Ok(extraction);
    }

    let url = attachments_url(base, mailbox, &message.id);
    for page in fetcher.pages::<Value>(url) {
        for entry in page?.items {
            match decode_entry(entry) {
                Ok(Some(record)) => {
                    let key = derive_key(message, &record.name);
                    debug!("Extracted {} ({} bytes)", key, record.payload.len());
                    extraction
                        .artifacts
                        .push(OutputArtifact::new(key, record.payload));
                }
                Ok(None) => {}
                Err(reason) => {
                    warn!(
                        "Skipping attachment of message {}: {}",
                        message.id.as_str(),
                        reason
                    );
                    extraction.failed += 1;
                }
            }
        }
    }

    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::graph::{HttpResponse, RetryPolicy};
    use crate::testing::{RecordingSleeper, ScriptedTransport, page_json};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    const BASE: &str = "https://graph.test/v1.0";
    const MAILBOX: &str = "ingest@example.com";

    fn message(has_attachments: bool) -> MessageSummary {
        MessageSummary::new(
            "msg-1",
            "  Vessel cert 2025/01  ",
            Utc.with_ymd_and_hms(2025, 1, 15, 8, 30, 5).unwrap(),
            has_attachments,
        )
    }

    fn file(name: Option<&str>, content_type: Option<&str>, bytes: Option<&[u8]>) -> Value {
        json!({
            "@odata.type": FILE_ATTACHMENT,
            "name": name,
            "contentType": content_type,
            "contentBytes": bytes.map(|b| BASE64_STANDARD.encode(b)),
        })
    }

    fn fetcher(transport: &Arc<ScriptedTransport>) -> PagedFetcher {
        PagedFetcher::new(
            transport.clone(),
            Arc::new(RecordingSleeper::new()),
            "token".into(),
            RetryPolicy::default(),
        )
    }

    fn first_url() -> String {
        attachments_url(BASE, MAILBOX, &MessageId::new("msg-1"))
    }

    #[test]
    fn test_is_pdf_uses_either_signal() {
        assert!(is_pdf("Invoice.PDF", ""));
        assert!(is_pdf("notes.txt", "application/pdf"));
        assert!(is_pdf("scan", "Application/PDF"));
        assert!(!is_pdf("notes.txt", "text/plain"));
        assert!(!is_pdf("report.pdf.zip", "application/zip"));
    }

    #[test]
    fn test_derive_key() {
        let key = derive_key(&message(true), "cert.pdf");
        assert_eq!(key, "20250115T083005Z__Vessel cert 2025_01__cert.pdf");
    }

    #[test]
    fn test_derive_key_truncates_subject() {
        let mut msg = message(true);
        msg.subject = "é".repeat(100);
        let key = derive_key(&msg, "a.pdf");
        let subject = key.split("__").nth(1).unwrap();
        assert_eq!(subject.chars().count(), 80);
    }

    #[test]
    fn test_derive_key_keeps_filename_in_one_segment() {
        let key = derive_key(&message(true), "../x\\y.pdf");
        assert!(key.ends_with("__.._x_y.pdf"));
        assert!(!key.contains('/'));
    }

    #[test]
    fn test_derive_key_empty_subject() {
        let mut msg = message(true);
        msg.subject = String::new();
        assert_eq!(derive_key(&msg, "a.pdf"), "20250115T083005Z____a.pdf");
    }

    #[test]
    fn test_no_attachments_makes_no_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let extraction = extract(&fetcher(&transport), BASE, MAILBOX, &message(false)).unwrap();

        assert!(extraction.artifacts.is_empty());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_filters_and_decodes() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            first_url(),
            HttpResponse::new(
                200,
                page_json(
                    &[
                        file(Some("Invoice.PDF"), None, Some(b"%PDF-1")),
                        file(Some("notes.txt"), Some("text/plain"), Some(b"hello")),
                        json!({
                            "@odata.type": "#microsoft.graph.itemAttachment",
                            "name": "forwarded.pdf",
                            "contentType": "application/pdf"
                        }),
                    ],
                    Some("https://graph.test/att-2"),
                ),
            ),
        );
        transport.respond(
            "https://graph.test/att-2",
            HttpResponse::new(
                200,
                page_json(
                    &[
                        file(Some("notes.txt"), Some("application/pdf"), Some(b"%PDF-2")),
                        file(Some("empty.pdf"), None, None),
                        file(None, Some("application/pdf"), Some(b"%PDF-3")),
                    ],
                    None,
                ),
            ),
        );

        let extraction = extract(&fetcher(&transport), BASE, MAILBOX, &message(true)).unwrap();

        let keys: Vec<&str> = extraction.artifacts.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "20250115T083005Z__Vessel cert 2025_01__Invoice.PDF",
                "20250115T083005Z__Vessel cert 2025_01__notes.txt",
                "20250115T083005Z__Vessel cert 2025_01__attachment",
            ]
        );
        assert_eq!(extraction.artifacts[0].payload, b"%PDF-1");
        assert_eq!(extraction.artifacts[1].payload, b"%PDF-2");
        assert_eq!(extraction.failed, 0);
    }

    #[test]
    fn test_bad_entries_do_not_stop_siblings() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            first_url(),
            HttpResponse::new(
                200,
                page_json(
                    &[
                        json!({
                            "@odata.type": FILE_ATTACHMENT,
                            "name": "broken.pdf",
                            "contentBytes": "not base64!!"
                        }),
                        json!({ "@odata.type": FILE_ATTACHMENT, "name": 42 }),
                        file(Some("good.pdf"), None, Some(b"%PDF-ok")),
                    ],
                    None,
                ),
            ),
        );

        let extraction = extract(&fetcher(&transport), BASE, MAILBOX, &message(true)).unwrap();

        assert_eq!(extraction.failed, 2);
        assert_eq!(extraction.artifacts.len(), 1);
        assert_eq!(extraction.artifacts[0].payload, b"%PDF-ok");
    }

    #[test]
    fn test_paging_error_is_propagated() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(first_url(), HttpResponse::new(500, "boom"));

        let err = extract(&fetcher(&transport), BASE, MAILBOX, &message(true)).unwrap_err();
        assert!(matches!(err, IngestError::RemoteApi { status: 500, .. }));
    }
}
