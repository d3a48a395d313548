//! Versioned Key-Value Store
//!
//! Keeps the current record for every key and resolves conflicting
//! writes with last-write-wins on the record timestamp.

use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::record::Record;

/// Thread-safe in-memory store with LWW merge
///
/// Reads share the lock; `merge` takes it exclusively so the
/// compare-then-set on a key can never interleave with another merge.
#[derive(Default)]
pub struct VersionedStore {
    data: RwLock<HashMap<String, Record>>,
}

impl VersionedStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a record to the store.
    ///
    /// The record becomes current if the key is absent or its timestamp is
    /// not older than the stored one. Older records are silently discarded.
    /// Returns whether the record was applied.
    pub async fn merge(&self, record: Record) -> bool {
        let mut data = self.data.write().await;

        match data.get(record.key()) {
            Some(current) if !record.supersedes(current) => {
                tracing::debug!(
                    "Discarding stale write for {} ({} < {})",
                    record.key(),
                    record.timestamp(),
                    current.timestamp()
                );
                false
            }
            _ => {
                data.insert(record.key().to_string(), record);
                true
            }
        }
    }

    /// Get the current record for a key
    pub async fn lookup(&self, key: &str) -> Option<Record> {
        self.data.read().await.get(key).cloned()
    }

    /// Copy every entry out of the store, ordered by key
    pub async fn snapshot(&self) -> BTreeMap<String, Record> {
        let data = self.data.read().await;
        data.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of keys held
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}
