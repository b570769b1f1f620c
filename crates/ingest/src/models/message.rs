//! Message summary as listed from the mailbox

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};
use crate::graph::api::GraphMessage;

/// Opaque Graph message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The fields of a message the extractor needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: MessageId,
    /// Raw subject; empty when the message has none
    pub subject: String,
    pub received_at: DateTime<Utc>,
    pub has_attachments: bool,
}

impl MessageSummary {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        received_at: DateTime<Utc>,
        has_attachments: bool,
    ) -> Self {
        Self {
            id: MessageId::new(id),
            subject: subject.into(),
            received_at,
            has_attachments,
        }
    }
}

impl TryFrom<GraphMessage> for MessageSummary {
    type Error = IngestError;

    fn try_from(msg: GraphMessage) -> Result<Self> {
        let received_at = DateTime::parse_from_rfc3339(&msg.received_date_time)
            .map_err(|e| {
                IngestError::Decode(format!(
                    "message {} has invalid receivedDateTime '{}': {}",
                    msg.id, msg.received_date_time, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: MessageId::new(msg.id),
            subject: msg.subject.unwrap_or_default(),
            received_at,
            has_attachments: msg.has_attachments.unwrap_or(false),
        })
    }
}
