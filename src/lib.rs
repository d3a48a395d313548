//! kvrepl - Leader-Driven Replicated Key-Value Store
//!
//! A small in-memory key-value store where a single leader accepts writes
//! and replicates each one to a fixed set of followers.
//!
//! # Architecture
//!
//! Every write is stamped with the leader's wall-clock time and merged into
//! each node's [`store::VersionedStore`] under last-write-wins, so followers
//! converge on the newest value per key no matter the order in which
//! deliveries arrive.
//!
//! # Features
//!
//! - Sync mode: acknowledge a write after delivery to every follower was attempted
//! - Async mode: acknowledge immediately and replicate in the background
//! - Partition simulation: block and unblock replication to individual peers
//! - HTTP API for reads, writes, status and partition control
//!
//! There is no consensus, election, catch-up or persistence: a follower that
//! misses a write stays stale for that key until a newer write reaches it.

pub mod config;
pub mod error;
pub mod store;
pub mod state;
pub mod replication;
pub mod api;

pub use config::KvConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::KvConfig;
    pub use crate::error::{Error, Result};
    pub use crate::store::{Record, VersionedStore};
    pub use crate::state::{NodeRole, NodeState, PartitionFilter, ReplicationMode};
    pub use crate::replication::{Broadcaster, FollowerNode, HttpTransport, LeaderNode};
    pub use crate::api::HttpServer;
}
