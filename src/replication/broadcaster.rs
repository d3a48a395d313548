//! Replication Broadcaster
//!
//! Fans one accepted write out to every configured peer, honoring the
//! partition filter and the leader's replication mode.

use std::sync::Arc;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::protocol::ReplicateRequest;
use super::transport::Transport;
use crate::state::{PartitionFilter, ReplicationMode};

/// Result of one per-peer delivery task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Peer acknowledged the write
    Delivered,
    /// Peer was blocked; no attempt was made
    Skipped,
    /// Attempt was made and failed (unreachable, timeout, rejected)
    Failed,
}

/// Per-broadcast tally of delivery outcomes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliverySummary {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DeliverySummary {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::Skipped => self.skipped += 1,
            DeliveryOutcome::Failed => self.failed += 1,
        }
    }

    /// Number of peers an outcome was observed for
    pub fn total(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// Deliveries that were launched but not awaited
///
/// Dropping this value detaches the tasks; they still run to completion
/// and log their own outcome.
#[derive(Debug)]
pub struct PendingDeliveries {
    request_id: String,
    handles: Vec<JoinHandle<DeliveryOutcome>>,
}

impl PendingDeliveries {
    /// Number of launched per-peer tasks
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every per-peer task and tally the outcomes
    pub async fn wait(self) -> DeliverySummary {
        let mut summary = DeliverySummary::default();

        for result in futures::future::join_all(self.handles).await {
            match result {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::error!("[req {}] delivery task aborted: {}", self.request_id, e);
                    summary.record(DeliveryOutcome::Failed);
                }
            }
        }

        summary
    }
}

/// What `broadcast` hands back, depending on the mode
#[derive(Debug)]
pub enum BroadcastOutcome {
    /// Sync mode: every peer has an observed outcome
    Completed(DeliverySummary),
    /// Async mode: deliveries are still in flight
    Launched(PendingDeliveries),
}

/// Concurrent fan-out of writes to peers
#[derive(Clone)]
pub struct Broadcaster {
    transport: Arc<dyn Transport>,
    partition: Arc<PartitionFilter>,
}

impl Broadcaster {
    pub fn new(transport: Arc<dyn Transport>, partition: Arc<PartitionFilter>) -> Self {
        Self {
            transport,
            partition,
        }
    }

    /// Replicate one write to `peers`.
    ///
    /// Each peer gets its own task. In sync mode this returns once all tasks
    /// have finished; in async mode it returns right after spawning them.
    /// Delivery failures are only logged and never fail the broadcast.
    pub async fn broadcast(
        &self,
        request: ReplicateRequest,
        peers: &[String],
        mode: ReplicationMode,
    ) -> BroadcastOutcome {
        let request_id = request.req_id.clone();
        tracing::info!(
            "[req {}] broadcasting {} to {} peers ({})",
            request_id,
            request.key,
            peers.len(),
            mode
        );

        let pending = self.launch(request, peers);

        match mode {
            ReplicationMode::Sync => {
                let summary = pending.wait().await;
                tracing::info!(
                    "[req {}] sync replication complete: delivered={} skipped={} failed={}",
                    request_id,
                    summary.delivered,
                    summary.skipped,
                    summary.failed
                );
                BroadcastOutcome::Completed(summary)
            }
            ReplicationMode::Async => BroadcastOutcome::Launched(pending),
        }
    }

    fn launch(&self, request: ReplicateRequest, peers: &[String]) -> PendingDeliveries {
        let request_id = request.req_id.clone();
        let request = Arc::new(request);

        let handles = peers
            .iter()
            .map(|peer| {
                let transport = Arc::clone(&self.transport);
                let partition = Arc::clone(&self.partition);
                let request = Arc::clone(&request);
                let peer = peer.clone();
                tokio::spawn(async move {
                    deliver_one(transport.as_ref(), &partition, &peer, &request).await
                })
            })
            .collect();

        PendingDeliveries { request_id, handles }
    }
}

async fn deliver_one(
    transport: &dyn Transport,
    partition: &PartitionFilter,
    peer: &str,
    request: &ReplicateRequest,
) -> DeliveryOutcome {
    if partition.is_blocked(peer).await {
        tracing::info!("[req {}] skipped replication to {} (blocked)", request.req_id, peer);
        return DeliveryOutcome::Skipped;
    }

    match transport.deliver(peer, request).await {
        Ok(()) => {
            tracing::info!("[req {}] replicated to {}", request.req_id, peer);
            DeliveryOutcome::Delivered
        }
        Err(e) => {
            tracing::warn!("[req {}] replication to {} failed: {}", request.req_id, peer, e);
            DeliveryOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use async_trait::async_trait;
    use tokio::net::TcpListener;
    use tokio::sync::Semaphore;
    use uuid::Uuid;

    use crate::error::{Error, Result};
    use crate::replication::HttpTransport;
    use crate::store::Record;

    const F1: &str = "http://follower1:8081";
    const F2: &str = "http://follower2:8082";
    const DOWN: &str = "http://down:9999";

    /// In-process transport recording what reached each peer
    #[derive(Default)]
    struct FakeTransport {
        delays: HashMap<String, Duration>,
        gate: Option<Arc<Semaphore>>,
        received: Mutex<Vec<(String, ReplicateRequest)>>,
    }

    impl FakeTransport {
        fn received_by(&self, peer: &str) -> Vec<ReplicateRequest> {
            self.received
                .lock()
                .unwrap()
                .iter()
                .filter(|(p, _)| p == peer)
                .map(|(_, r)| r.clone())
                .collect()
        }

        fn total(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn deliver(&self, peer: &str, request: &ReplicateRequest) -> Result<()> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if let Some(delay) = self.delays.get(peer) {
                tokio::time::sleep(*delay).await;
            }
            match peer {
                DOWN => Err(Error::ConnectionFailed {
                    address: peer.to_string(),
                    reason: "connection refused".to_string(),
                }),
                "http://panic:1" => panic!("transport bug"),
                _ => {
                    self.received
                        .lock()
                        .unwrap()
                        .push((peer.to_string(), request.clone()));
                    Ok(())
                }
            }
        }
    }

    fn request(key: &str, value: &str) -> ReplicateRequest {
        ReplicateRequest::new(&Record::now(key, value), Uuid::new_v4().to_string())
    }

    fn peers(list: &[&str]) -> Vec<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    fn summary_of(outcome: BroadcastOutcome) -> DeliverySummary {
        match outcome {
            BroadcastOutcome::Completed(summary) => summary,
            BroadcastOutcome::Launched(_) => panic!("expected a completed broadcast"),
        }
    }

    #[tokio::test]
    async fn test_sync_delivers_to_every_peer() {
        let transport = Arc::new(FakeTransport::default());
        let broadcaster = Broadcaster::new(transport.clone(), Arc::new(PartitionFilter::new()));

        let req = request("city", "Raleigh");
        let outcome = broadcaster
            .broadcast(req.clone(), &peers(&[F1, F2]), ReplicationMode::Sync)
            .await;

        let summary = summary_of(outcome);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.total(), 2);
        assert_eq!(transport.received_by(F1), vec![req.clone()]);
        assert_eq!(transport.received_by(F2), vec![req]);
    }

    #[tokio::test]
    async fn test_sync_waits_for_slowest_peer() {
        let mut transport = FakeTransport::default();
        transport.delays.insert(F2.to_string(), Duration::from_millis(150));
        let transport = Arc::new(transport);
        let broadcaster = Broadcaster::new(transport.clone(), Arc::new(PartitionFilter::new()));

        let started = Instant::now();
        let outcome = broadcaster
            .broadcast(request("k", "v"), &peers(&[F1, F2]), ReplicationMode::Sync)
            .await;

        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(summary_of(outcome).delivered, 2);
        assert_eq!(transport.received_by(F2).len(), 1);
    }

    #[tokio::test]
    async fn test_sync_bounded_by_transport_timeout() {
        // Kept alive but never accepted: the handshake completes, no reply comes
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let peer = format!("http://{}", listener.local_addr().unwrap());

        let timeout = Duration::from_millis(300);
        let transport = Arc::new(HttpTransport::new(timeout).unwrap());
        let broadcaster = Broadcaster::new(transport, Arc::new(PartitionFilter::new()));

        let started = Instant::now();
        let outcome = broadcaster
            .broadcast(request("k", "v"), &[peer], ReplicationMode::Sync)
            .await;
        let elapsed = started.elapsed();

        let summary = summary_of(outcome);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.delivered, 0);
        assert!(elapsed >= timeout, "returned after {:?}", elapsed);
        assert!(elapsed < timeout * 2, "returned after {:?}", elapsed);
        drop(listener);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_broadcast() {
        let transport = Arc::new(FakeTransport::default());
        let broadcaster = Broadcaster::new(transport.clone(), Arc::new(PartitionFilter::new()));

        let outcome = broadcaster
            .broadcast(
                request("k", "v"),
                &peers(&[F1, DOWN, "http://panic:1"]),
                ReplicationMode::Sync,
            )
            .await;

        let summary = summary_of(outcome);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 2);
        assert_eq!(transport.received_by(F1).len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_peer_is_skipped() {
        let transport = Arc::new(FakeTransport::default());
        let partition = Arc::new(PartitionFilter::new());
        partition.block(F1).await;
        let broadcaster = Broadcaster::new(transport.clone(), partition.clone());

        let outcome = broadcaster
            .broadcast(request("weather", "clear"), &peers(&[F1, F2]), ReplicationMode::Sync)
            .await;

        let summary = summary_of(outcome);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 0);
        assert!(transport.received_by(F1).is_empty());

        // Unblocking does not redeliver the missed write
        partition.unblock(F1).await;
        let later = request("weather", "rainy");
        broadcaster
            .broadcast(later.clone(), &peers(&[F1, F2]), ReplicationMode::Sync)
            .await;
        assert_eq!(transport.received_by(F1), vec![later]);
    }

    #[tokio::test]
    async fn test_async_returns_before_delivery() {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Arc::new(FakeTransport {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let broadcaster = Broadcaster::new(transport.clone(), Arc::new(PartitionFilter::new()));

        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            broadcaster.broadcast(request("k", "v"), &peers(&[F1, F2]), ReplicationMode::Async),
        )
        .await
        .expect("async broadcast must not wait for deliveries");

        let pending = match outcome {
            BroadcastOutcome::Launched(pending) => pending,
            BroadcastOutcome::Completed(_) => panic!("expected launched deliveries"),
        };
        assert_eq!(pending.len(), 2);
        assert_eq!(transport.total(), 0);

        gate.add_permits(2);
        let summary = pending.wait().await;
        assert_eq!(summary.delivered, 2);
        assert_eq!(transport.total(), 2);
    }

    #[tokio::test]
    async fn test_detached_deliveries_still_complete() {
        let transport = Arc::new(FakeTransport::default());
        let broadcaster = Broadcaster::new(transport.clone(), Arc::new(PartitionFilter::new()));

        let outcome = broadcaster
            .broadcast(request("k", "v"), &peers(&[F1, F2]), ReplicationMode::Async)
            .await;
        drop(outcome);

        let deadline = Instant::now() + Duration::from_secs(2);
        while transport.total() < 2 {
            assert!(Instant::now() < deadline, "detached deliveries never finished");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_no_peers() {
        let broadcaster = Broadcaster::new(
            Arc::new(FakeTransport::default()),
            Arc::new(PartitionFilter::new()),
        );

        let outcome = broadcaster
            .broadcast(request("k", "v"), &[], ReplicationMode::Sync)
            .await;
        assert_eq!(summary_of(outcome), DeliverySummary::default());
    }
}
