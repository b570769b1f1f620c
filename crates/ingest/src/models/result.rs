//! Aggregate outcome of an ingest run

use serde::Serialize;

use super::OutputArtifact;
use crate::window::TimeWindow;

/// Counters and artifacts produced by one run
#[derive(Debug, Clone)]
pub struct IngestResult {
    /// Window the run covered
    pub window: TimeWindow,
    /// Messages listed in the window
    pub messages_scanned: usize,
    /// PDF attachments uploaded
    pub attachments_saved: usize,
    /// Attachments skipped because they could not be decoded
    pub attachments_failed: usize,
    /// Artifacts uploaded but not mirrored to the local cache
    pub cache_failures: usize,
    /// Uploaded artifacts in processing order
    pub artifacts: Vec<OutputArtifact>,
    /// Wall time of the run
    pub duration_ms: u64,
}

impl IngestResult {
    pub fn empty(window: TimeWindow) -> Self {
        Self {
            window,
            messages_scanned: 0,
            attachments_saved: 0,
            attachments_failed: 0,
            cache_failures: 0,
            artifacts: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Payload-free view for logs and JSON output
    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            window: self.window,
            messages_scanned: self.messages_scanned,
            attachments_saved: self.attachments_saved,
            attachments_failed: self.attachments_failed,
            cache_failures: self.cache_failures,
            artifacts: self
                .artifacts
                .iter()
                .map(|a| ArtifactInfo {
                    key: a.key.clone(),
                    size: a.size(),
                })
                .collect(),
            duration_ms: self.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactInfo {
    pub key: String,
    pub size: usize,
}

/// Serializable summary of an [`IngestResult`]
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub window: TimeWindow,
    pub messages_scanned: usize,
    pub attachments_saved: usize,
    pub attachments_failed: usize,
    pub cache_failures: usize,
    pub artifacts: Vec<ArtifactInfo>,
    pub duration_ms: u64,
}
