//! In-memory object store
//!
//! Only built for tests. Can be told to fail uploads for specific keys to
//! exercise error paths.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::ObjectStore;
use crate::error::{IngestError, Result};

/// An object as it was last written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    failing_keys: RwLock<HashSet<String>>,
    puts: RwLock<usize>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put` of `key` fail
    pub fn fail_on(&self, key: impl Into<String>) {
        self.failing_keys.write().unwrap().insert(key.into());
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().unwrap().get(key).cloned()
    }

    /// Number of distinct objects
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted object keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Successful `put` calls, counting overwrites
    pub fn put_count(&self) -> usize {
        *self.puts.read().unwrap()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<()> {
        if self.failing_keys.read().unwrap().contains(key) {
            return Err(IngestError::storage(key, "simulated upload failure"));
        }

        self.objects.write().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        *self.puts.write().unwrap() += 1;
        Ok(())
    }

    fn check_access(&self) -> Result<()> {
        Ok(())
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }
}
