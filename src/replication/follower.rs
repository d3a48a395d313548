//! Follower Node Implementation
//!
//! Applies writes replicated from the leader to the local store.

use std::sync::Arc;

use super::protocol::ReplicateRequest;
use crate::error::{Error, Result};
use crate::state::NodeState;
use crate::store::VersionedStore;

/// Follower apply path
#[derive(Clone)]
pub struct FollowerNode {
    node: Arc<NodeState>,
    store: Arc<VersionedStore>,
}

impl FollowerNode {
    pub fn new(node: Arc<NodeState>, store: Arc<VersionedStore>) -> Self {
        Self { node, store }
    }

    /// Apply a replicated write.
    ///
    /// Stale writes are discarded by the store but still acknowledged: the
    /// delivery itself succeeded.
    pub async fn apply(&self, request: ReplicateRequest) -> Result<()> {
        if self.node.is_leader() {
            return Err(Error::NotFollower(self.node.id().to_string()));
        }
        if request.key.is_empty() {
            return Err(Error::InvalidRequest("key cannot be empty".into()));
        }

        tracing::info!(
            "[req {}] follower replicating: {}={}",
            request.req_id,
            request.key,
            request.value
        );

        if !self.store.merge(request.record()).await {
            tracing::debug!("[req {}] stale write for {} ignored", request.req_id, request.key);
        }

        Ok(())
    }
}
