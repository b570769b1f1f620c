//! Attachments and the artifacts derived from them

/// Content type every stored artifact is uploaded with
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A decoded file attachment, alive only while its message is processed
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    pub name: String,
    pub content_type: String,
    pub payload: Vec<u8>,
    pub is_pdf: bool,
}

/// Named payload handed to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub key: String,
    pub payload: Vec<u8>,
}

impl OutputArtifact {
    pub fn new(key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            payload,
        }
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
