//! Record Type
//!
//! The unit of storage and replication: an immutable
//! `(key, value, timestamp)` triple.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock instant at which the leader accepted a write
pub type Timestamp = DateTime<Utc>;

/// A single versioned key-value pair
///
/// Records are never mutated after creation. An update to a key produces a
/// new `Record` with a later timestamp, and the store decides which one is
/// current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    key: String,
    value: String,
    #[serde(rename = "ts")]
    timestamp: Timestamp,
}

impl Record {
    /// Create a record with an explicit timestamp
    pub fn new(key: impl Into<String>, value: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            timestamp,
        }
    }

    /// Create a record stamped with the current time
    pub fn now(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, value, Utc::now())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether this record wins against `current` under last-write-wins.
    ///
    /// Equal timestamps favor `self`, so re-applying the stored record is a
    /// no-op and the most recently applied of two equal-timestamp writes wins.
    pub fn supersedes(&self, current: &Record) -> bool {
        self.timestamp >= current.timestamp
    }
}
