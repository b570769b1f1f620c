//! Domain models for one ingest run

mod artifact;
mod message;
mod result;

pub use artifact::{AttachmentRecord, OutputArtifact, PDF_CONTENT_TYPE};
pub use message::{MessageId, MessageSummary};
pub use result::{ArtifactInfo, IngestResult, IngestSummary};
