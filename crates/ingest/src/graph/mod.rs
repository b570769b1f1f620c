//! Microsoft Graph integration
//!
//! This module provides:
//! - Token providers for app-only authentication
//! - A blocking HTTP transport seam
//! - The retry-aware pager shared by every list endpoint
//! - Message listing and PDF attachment extraction

mod attachments;
mod auth;
mod http;
mod messages;
mod pager;

pub use attachments::{Extraction, derive_key, extract, is_pdf};
pub use auth::{ClientCredentialsAuth, MetadataServerToken, StaticToken, TokenProvider};
pub use http::{HttpResponse, HttpTransport, UreqTransport};
pub use messages::{list_messages, messages_url};
pub use pager::{Items, Page, PagedFetcher, Pages, RetryPolicy, Sleeper, ThreadSleeper};

/// Graph v1.0 base URL
pub const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Graph API response types
pub mod api {
    use serde::Deserialize;

    /// `@odata.type` of attachments that carry their bytes inline
    pub const FILE_ATTACHMENT: &str = "#microsoft.graph.fileAttachment";

    /// One page of any Graph collection
    #[derive(Debug, Deserialize)]
    pub struct CollectionPage<T> {
        #[serde(default = "Vec::new")]
        pub value: Vec<T>,
        #[serde(rename = "@odata.nextLink")]
        pub next_link: Option<String>,
    }

    /// Message projected to `id,subject,receivedDateTime,hasAttachments`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GraphMessage {
        pub id: String,
        pub subject: Option<String>,
        pub received_date_time: String,
        pub has_attachments: Option<bool>,
    }

    /// Attachment entry from `/messages/{id}/attachments`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GraphAttachment {
        #[serde(rename = "@odata.type")]
        pub odata_type: Option<String>,
        pub name: Option<String>,
        pub content_type: Option<String>,
        pub content_bytes: Option<String>,
    }
}
