//! Replication Protocol
//!
//! JSON bodies exchanged between a leader and its followers.

use serde::{Deserialize, Serialize};

use crate::store::record::{Record, Timestamp};

/// Path every follower exposes for replicated writes
pub const REPLICATE_PATH: &str = "/replicate";

/// Single write sent from a leader to a follower
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicateRequest {
    pub key: String,
    pub value: String,
    pub ts: Timestamp,
    /// Opaque id correlating log lines across nodes; not used for deduplication
    pub req_id: String,
}

impl ReplicateRequest {
    /// Wrap a record accepted by the leader
    pub fn new(record: &Record, req_id: impl Into<String>) -> Self {
        Self {
            key: record.key().to_string(),
            value: record.value().to_string(),
            ts: record.timestamp(),
            req_id: req_id.into(),
        }
    }

    /// The record this request carries
    pub fn record(&self) -> Record {
        Record::new(self.key.clone(), self.value.clone(), self.ts)
    }
}

/// Follower acknowledgment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateResponse {
    pub status: String,
}

impl ReplicateResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
