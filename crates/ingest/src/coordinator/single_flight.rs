//! At most one in-progress run per key

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

/// Set of keys with a run in progress
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: Mutex<HashSet<String>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the set inconsistent
    fn keys(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claim `key`, or `None` if it is already claimed.
    ///
    /// The claim is released when the returned guard is dropped.
    pub fn try_acquire(&self, key: &str) -> Option<FlightGuard<'_>> {
        if self.keys().insert(key.to_string()) {
            Some(FlightGuard {
                owner: self,
                key: key.to_string(),
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.keys().contains(key)
    }
}

/// Releases its key on drop
#[derive(Debug)]
pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.keys().remove(&self.key);
    }
}
