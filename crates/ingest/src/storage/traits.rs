//! Storage trait definitions

use crate::error::Result;

/// Key-value object store the artifacts are uploaded to
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Verify the destination exists and is writable by us.
    ///
    /// Called once before a run; failure is a configuration error.
    fn check_access(&self) -> Result<()>;

    /// Human-readable location, e.g. `gs://bucket`
    fn location(&self) -> String;
}
