//! Leader Node Implementation
//!
//! Accepts client writes: stamps them, applies them locally and
//! replicates them to the configured followers.

use std::sync::Arc;
use serde::Serialize;
use uuid::Uuid;

use super::broadcaster::{BroadcastOutcome, Broadcaster, DeliverySummary, PendingDeliveries};
use super::protocol::ReplicateRequest;
use crate::error::{Error, Result};
use crate::state::{NodeState, ReplicationMode};
use crate::store::{Record, VersionedStore};

/// Acknowledgment for an accepted client write
#[derive(Debug)]
pub struct WriteReceipt {
    pub record: Record,
    pub request_id: Uuid,
    pub mode: ReplicationMode,
    pub replication: Replication,
}

/// Replication state of an accepted write at the time it is acknowledged
#[derive(Debug)]
pub enum Replication {
    /// Sync mode: delivery was attempted on every peer
    Attempted(DeliverySummary),
    /// Async mode: deliveries are still running
    InFlight(PendingDeliveries),
}

/// Client-facing write acknowledgment, as returned over HTTP
#[derive(Debug, Serialize)]
pub struct WriteAck {
    pub status: &'static str,
    pub mode: ReplicationMode,
    pub req_id: Uuid,
}

impl From<&WriteReceipt> for WriteAck {
    fn from(receipt: &WriteReceipt) -> Self {
        Self {
            status: "ok",
            mode: receipt.mode,
            req_id: receipt.request_id,
        }
    }
}

/// Leader write path
#[derive(Clone)]
pub struct LeaderNode {
    node: Arc<NodeState>,
    store: Arc<VersionedStore>,
    broadcaster: Broadcaster,
}

impl LeaderNode {
    pub fn new(node: Arc<NodeState>, store: Arc<VersionedStore>, broadcaster: Broadcaster) -> Self {
        Self {
            node,
            store,
            broadcaster,
        }
    }

    /// Accept a client write.
    ///
    /// Rejected without touching any state if this node is not the leader
    /// or the key is empty. Otherwise the write is applied locally and
    /// replicated according to the node's mode; replication failures never
    /// fail the write.
    pub async fn write(&self, key: String, value: String) -> Result<WriteReceipt> {
        if !self.node.is_leader() {
            return Err(Error::NotLeader(self.node.id().to_string()));
        }
        if key.is_empty() {
            return Err(Error::InvalidRequest("key cannot be empty".into()));
        }

        let request_id = Uuid::new_v4();
        let record = Record::now(key, value);

        self.store.merge(record.clone()).await;
        tracing::info!(
            "[req {}] leader local upsert: {}={}",
            request_id,
            record.key(),
            record.value()
        );

        let mode = self.node.mode();
        let outcome = self
            .broadcaster
            .broadcast(
                ReplicateRequest::new(&record, request_id.to_string()),
                self.node.peers(),
                mode,
            )
            .await;

        let replication = match outcome {
            BroadcastOutcome::Completed(summary) => Replication::Attempted(summary),
            BroadcastOutcome::Launched(pending) => Replication::InFlight(pending),
        };

        Ok(WriteReceipt {
            record,
            request_id,
            mode,
            replication,
        })
    }

    pub fn node(&self) -> &Arc<NodeState> {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;

    use crate::replication::Transport;
    use crate::state::NodeRole;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, ReplicateRequest)>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(&self, peer: &str, request: &ReplicateRequest) -> Result<()> {
            self.sent.lock().unwrap().push((peer.to_string(), request.clone()));
            Ok(())
        }
    }

    fn make_leader(role: NodeRole, mode: ReplicationMode) -> (LeaderNode, Arc<RecordingTransport>) {
        let node = Arc::new(NodeState::new(
            "leader-1",
            role,
            mode,
            8080,
            vec!["http://f1:8081".to_string(), "http://f2:8082".to_string()],
        ));
        let transport = Arc::new(RecordingTransport::default());
        let broadcaster = Broadcaster::new(transport.clone(), node.partition().clone());
        let leader = LeaderNode::new(node, Arc::new(VersionedStore::new()), broadcaster);
        (leader, transport)
    }

    #[tokio::test]
    async fn test_write_applies_and_replicates() {
        let (leader, transport) = make_leader(NodeRole::Leader, ReplicationMode::Sync);

        let receipt = leader.write("city".into(), "Raleigh".into()).await.unwrap();
        assert_eq!(receipt.mode, ReplicationMode::Sync);
        assert!(matches!(
            receipt.replication,
            Replication::Attempted(DeliverySummary { delivered: 2, .. })
        ));

        let stored = leader.store.lookup("city").await.unwrap();
        assert_eq!(stored, receipt.record);

        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        let req_id = receipt.request_id.to_string();
        assert!(sent.iter().all(|(_, r)| r.req_id == req_id && r.record() == stored));
    }

    #[tokio::test]
    async fn test_async_write_acknowledges() {
        let (leader, _transport) = make_leader(NodeRole::Leader, ReplicationMode::Async);

        let receipt = leader.write("k".into(), "v".into()).await.unwrap();
        let ack = WriteAck::from(&receipt);
        assert_eq!(ack.status, "ok");
        assert_eq!(ack.mode, ReplicationMode::Async);

        match receipt.replication {
            Replication::InFlight(pending) => assert_eq!(pending.wait().await.delivered, 2),
            Replication::Attempted(_) => panic!("async write must not wait"),
        }
    }

    #[tokio::test]
    async fn test_rejects_without_mutation() {
        let (leader, transport) = make_leader(NodeRole::Leader, ReplicationMode::Sync);
        let err = leader.write(String::new(), "v".into()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));

        let (follower, _) = make_leader(NodeRole::Follower, ReplicationMode::Sync);
        let err = follower.write("k".into(), "v".into()).await.unwrap_err();
        assert!(matches!(err, Error::NotLeader(_)));

        assert!(leader.store.is_empty().await);
        assert!(follower.store.is_empty().await);
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
