//! Node Role and Replication Mode
//!
//! Static per-process identity that gates which operations a node
//! accepts and how a leader replicates.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::partition::PartitionFilter;
use crate::config::KvConfig;
use crate::error::Error;

/// Role of a node in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Accepts client writes and replicates them to its peers
    Leader,
    /// Accepts replicated writes from the leader and serves reads
    Follower,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Leader => write!(f, "leader"),
            NodeRole::Follower => write!(f, "follower"),
        }
    }
}

impl FromStr for NodeRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leader" => Ok(NodeRole::Leader),
            "follower" => Ok(NodeRole::Follower),
            other => Err(Error::Config(format!(
                "unknown role '{}', expected leader|follower",
                other
            ))),
        }
    }
}

/// How a leader acknowledges writes relative to replication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplicationMode {
    /// Respond once delivery to every peer has been attempted
    Sync,
    /// Respond as soon as deliveries are launched
    Async,
}

impl std::fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplicationMode::Sync => write!(f, "sync"),
            ReplicationMode::Async => write!(f, "async"),
        }
    }
}

impl FromStr for ReplicationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(ReplicationMode::Sync),
            "async" => Ok(ReplicationMode::Async),
            other => Err(Error::Config(format!(
                "unknown mode '{}', expected sync|async",
                other
            ))),
        }
    }
}

/// Identity and replication policy of this process
///
/// Everything here is fixed at startup except the partition filter,
/// which the admin API mutates at runtime.
#[derive(Debug)]
pub struct NodeState {
    id: String,
    role: NodeRole,
    mode: ReplicationMode,
    port: u16,
    peers: Vec<String>,
    partition: Arc<PartitionFilter>,
}

impl NodeState {
    /// Create a node state. `peers` must already be normalized base URLs.
    pub fn new(
        id: impl Into<String>,
        role: NodeRole,
        mode: ReplicationMode,
        port: u16,
        peers: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role,
            mode,
            port,
            peers,
            partition: Arc::new(PartitionFilter::new()),
        }
    }

    /// Build the node state described by a validated configuration
    pub fn from_config(config: &KvConfig) -> Self {
        // Followers never originate replication
        let peers = match config.node.role {
            NodeRole::Leader => config.peers(),
            NodeRole::Follower => Vec::new(),
        };

        Self::new(
            config.node.id.clone(),
            config.node.role,
            config.node.mode,
            config.node.port,
            peers,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn mode(&self) -> ReplicationMode {
        self.mode
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Peer base URLs this node replicates to
    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn partition(&self) -> &Arc<PartitionFilter> {
        &self.partition
    }

    pub fn is_leader(&self) -> bool {
        self.role == NodeRole::Leader
    }

    pub fn is_follower(&self) -> bool {
        self.role == NodeRole::Follower
    }

    /// Local base URL for this node
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}
