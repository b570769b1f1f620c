//! Error taxonomy for an ingestion run

/// Errors surfaced by the ingestion pipeline.
///
/// Throttling responses (429/503/504) never appear here directly; they are
/// absorbed by the pager's backoff loop and only become
/// [`IngestError::RetryExhausted`] once the attempt budget is spent.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Invalid or missing setting (zone id, cutoff hour, bucket)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Non-retryable HTTP failure from the mail API
    #[error("Remote API returned HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    /// Throttled on every attempt
    #[error("Gave up on {url} after {attempts} attempts (last status {last_status})")]
    RetryExhausted {
        url: String,
        attempts: u32,
        last_status: u16,
    },

    /// Token acquisition failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network-level failure (DNS, TLS, connection reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Upload to the object store failed
    #[error("Failed to store '{key}': {message}")]
    Storage { key: String, message: String },

    /// Another run for the same mailbox is in progress
    #[error("An ingest run for {0} is already in progress")]
    AlreadyRunning(String),
}

impl IngestError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn storage(key: impl Into<String>, message: impl ToString) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }
}

impl From<ureq::Error> for IngestError {
    fn from(e: ureq::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
