//! Windowed message listing

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use url::Url;

use super::api::GraphMessage;
use super::pager::PagedFetcher;
use crate::error::{IngestError, Result};
use crate::models::MessageSummary;
use crate::window::TimeWindow;

/// Messages requested per page
const PAGE_SIZE: usize = 50;

/// Fields the rest of the pipeline reads
const SELECT_FIELDS: &str = "id,subject,receivedDateTime,hasAttachments";

fn graph_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Build the first-page URL listing `mailbox` messages received in `window`.
///
/// The filter is start-inclusive and end-exclusive so a message landing on
/// the boundary belongs to exactly one run.
pub fn messages_url(base: &str, mailbox: &str, window: &TimeWindow) -> Result<String> {
    let filter = format!(
        "receivedDateTime ge {} and receivedDateTime lt {}",
        graph_timestamp(window.start()),
        graph_timestamp(window.end())
    );
    let endpoint = format!("{}/users/{}/messages", base, urlencoding::encode(mailbox));
    let page_size = PAGE_SIZE.to_string();

    let url = Url::parse_with_params(
        &endpoint,
        [
            ("$filter", filter.as_str()),
            ("$select", SELECT_FIELDS),
            ("$orderby", "receivedDateTime desc"),
            ("$top", page_size.as_str()),
        ],
    )
    .map_err(|e| IngestError::config(format!("invalid messages URL '{}': {}", endpoint, e)))?;

    Ok(url.into())
}

/// Lazily list messages in `window`, newest first.
///
/// Messages the server returns outside the window are dropped with a warning.
pub fn list_messages<'f>(
    fetcher: &'f PagedFetcher,
    base: &str,
    mailbox: &str,
    window: TimeWindow,
) -> Result<impl Iterator<Item = Result<MessageSummary>> + use<'f>> {
    let url = messages_url(base, mailbox, &window)?;

    let messages = fetcher
        .pages::<GraphMessage>(url)
        .items()
        .map(|item| item.and_then(MessageSummary::try_from))
        .filter(move |item| match item {
            Ok(summary) if !window.contains(summary.received_at) => {
                warn!(
                    "Dropping message {} received at {} outside window",
                    summary.id.as_str(),
                    summary.received_at
                );
                false
            }
            _ => true,
        });

    Ok(messages)
}
