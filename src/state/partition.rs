//! Partition Simulation
//!
//! A set of peers the leader must not replicate to, used to emulate
//! network partitions from the admin API.

use std::collections::{BTreeSet, HashSet};
use tokio::sync::RwLock;

/// Set of currently blocked peer addresses
///
/// A peer that is not in the set is deliverable. The broadcaster reads the
/// set once per delivery attempt; a peer unblocked between that check and
/// the network call is simply missed for that write.
#[derive(Debug, Default)]
pub struct PartitionFilter {
    blocked: RwLock<HashSet<String>>,
}

impl PartitionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block a peer. Returns `true` if it was not already blocked.
    pub async fn block(&self, peer: &str) -> bool {
        self.blocked.write().await.insert(peer.to_string())
    }

    /// Unblock a peer. Returns `true` if it was blocked.
    pub async fn unblock(&self, peer: &str) -> bool {
        self.blocked.write().await.remove(peer)
    }

    pub async fn is_blocked(&self, peer: &str) -> bool {
        self.blocked.read().await.contains(peer)
    }

    /// Currently blocked peers, sorted
    pub async fn list(&self) -> BTreeSet<String> {
        self.blocked.read().await.iter().cloned().collect()
    }
}
