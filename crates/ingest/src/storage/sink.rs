//! Durable upload with an optional local mirror

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use super::ObjectStore;
use crate::error::Result;
use crate::models::{OutputArtifact, PDF_CONTENT_TYPE};

/// What happened to one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOutcome {
    /// A local copy was written to the cache directory
    pub cached: bool,
}

/// Writes artifacts to the object store and, if configured, a local cache.
///
/// The local copy is written first. Its failure is logged and reported in the
/// outcome but never prevents the upload; an upload failure is an error.
pub struct StorageSink {
    store: Arc<dyn ObjectStore>,
    cache_dir: Option<PathBuf>,
}

impl StorageSink {
    pub fn new(store: Arc<dyn ObjectStore>, cache_dir: Option<PathBuf>) -> Self {
        Self { store, cache_dir }
    }

    /// One-time destination check before a run
    pub fn check_access(&self) -> Result<()> {
        self.store.check_access()
    }

    pub fn store_location(&self) -> String {
        self.store.location()
    }

    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Store one artifact under its key
    pub fn store(&self, artifact: &OutputArtifact) -> Result<StoreOutcome> {
        let cached = match &self.cache_dir {
            Some(dir) => match write_local(dir, artifact) {
                Ok(path) => {
                    debug!("Cached {}", path.display());
                    true
                }
                Err(e) => {
                    warn!(
                        "Failed to cache {} in {}: {}",
                        artifact.key,
                        dir.display(),
                        e
                    );
                    false
                }
            },
            None => false,
        };

        self.store
            .put(&artifact.key, &artifact.payload, PDF_CONTENT_TYPE)?;

        Ok(StoreOutcome { cached })
    }
}

fn write_local(dir: &Path, artifact: &OutputArtifact) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(&artifact.key);
    fs::write(&path, &artifact.payload)?;
    Ok(path)
}
