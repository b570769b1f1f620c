//! Directory-backed object store

use std::fs;
use std::path::{Path, PathBuf};

use super::ObjectStore;
use crate::error::{IngestError, Result};

/// Stores each object as `{root}/{key}`.
///
/// Selected with a `file:///path` bucket. Keys are single path segments, so
/// the layout is flat:
/// ```text
/// root/
///   20250115T083005Z__Vessel cert__cert.pdf
///   20250115T091200Z__Survey__report.pdf
/// ```
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    /// URI scheme that selects this backend
    pub const SCHEME: &'static str = "file://";

    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Parse a `file:///path` bucket; `None` for any other scheme
    pub fn from_uri(uri: &str) -> Option<Self> {
        uri.strip_prefix(Self::SCHEME).map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl ObjectStore for FileObjectStore {
    fn put(&self, key: &str, data: &[u8], _content_type: &str) -> Result<()> {
        let path = self.object_path(key);

        // Write atomically (write to temp, then rename)
        let temp_path = self.root.join(format!(".{}.tmp", key));
        fs::write(&temp_path, data).map_err(|e| IngestError::storage(key, e))?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(IngestError::storage(key, e));
        }

        Ok(())
    }

    fn check_access(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(IngestError::config(format!(
                "storage directory '{}' not found or inaccessible",
                self.root.display()
            )))
        }
    }

    fn location(&self) -> String {
        format!("{}{}", Self::SCHEME, self.root.display())
    }
}
