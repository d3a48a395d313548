//! Replication Module
//!
//! Moves writes from the leader to its followers: wire types, the
//! per-peer transport, the fan-out broadcaster and the two node roles.

pub mod protocol;
mod transport;
mod broadcaster;
mod leader;
mod follower;

pub use protocol::{ReplicateRequest, ReplicateResponse};
pub use transport::{HttpTransport, Transport};
pub use broadcaster::{
    BroadcastOutcome, Broadcaster, DeliveryOutcome, DeliverySummary, PendingDeliveries,
};
pub use leader::{LeaderNode, Replication, WriteAck, WriteReceipt};
pub use follower::FollowerNode;

use std::time::Duration;

/// Configuration for replication
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Per-delivery timeout in milliseconds
    pub replication_timeout_ms: u64,
}

impl ReplicationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.replication_timeout_ms)
    }
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replication_timeout_ms: 5000,
        }
    }
}

impl From<&crate::config::KvConfig> for ReplicationConfig {
    fn from(config: &crate::config::KvConfig) -> Self {
        Self {
            replication_timeout_ms: config.cluster.replication_timeout_ms,
        }
    }
}
