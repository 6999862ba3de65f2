//! TTL (Time-To-Live) index for efficient expiration cleanup
//!
//! Maps deadline → set of keys using a BTreeMap for sorted order, so that
//! finding expired keys is O(expired count) instead of O(total keys).

use std::collections::BTreeMap;
use std::time::Instant;

use rustc_hash::FxHashSet;

/// TTL index: deadline → keys
#[derive(Debug, Default)]
pub struct TTLIndex {
    index: BTreeMap<Instant, FxHashSet<String>>,
}

impl TTLIndex {
    /// Create a new empty TTLIndex
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
        }
    }

    /// Register `key` as expiring at `deadline`
    pub fn insert(&mut self, deadline: Instant, key: String) {
        self.index.entry(deadline).or_default().insert(key);
    }

    /// Unregister `key` from `deadline`
    ///
    /// Used when a key is deleted, persisted, or given a new deadline.
    /// If the set becomes empty, removes the deadline entry entirely.
    pub fn remove(&mut self, deadline: Instant, key: &str) {
        if let Some(keys) = self.index.get_mut(&deadline) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&deadline);
            }
        }
    }

    /// All keys whose deadline is at or before `now`
    pub fn find_expired(&self, now: Instant) -> Vec<String> {
        self.index
            .range(..=now)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    /// Drop every entry with a deadline at or before `now`
    ///
    /// Returns the number of keys removed from the index.
    pub fn remove_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<Instant> = self.index.range(..=now).map(|(ts, _)| *ts).collect();

        let mut count = 0;
        for ts in expired {
            if let Some(keys) = self.index.remove(&ts) {
                count += keys.len();
            }
        }
        count
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total number of keys in the index
    pub fn len(&self) -> usize {
        self.index.values().map(|keys| keys.len()).sum()
    }

    /// Number of distinct deadlines
    pub fn deadline_count(&self) -> usize {
        self.index.len()
    }
}
