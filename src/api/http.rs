//! HTTP API Server
//!
//! REST API for client reads and writes, follower replication,
//! status and partition simulation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use axum::{
    extract::{rejection::JsonRejection, Query, State, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::{normalize_peer, KvConfig};
use crate::error::{Error, Result};
use crate::replication::{
    Broadcaster, FollowerNode, HttpTransport, LeaderNode, ReplicateRequest, ReplicateResponse,
    Replication, ReplicationConfig, WriteAck,
};
use crate::state::{NodeRole, NodeState, ReplicationMode};
use crate::store::{Record, VersionedStore};

/// Shared application state
pub struct AppState {
    /// Identity, role and partition filter of this node
    pub node: Arc<NodeState>,
    /// Local versioned store
    pub store: Arc<VersionedStore>,
    /// Client write path
    pub leader: LeaderNode,
    /// Replicated write path
    pub follower: FollowerNode,
}

/// HTTP API server
pub struct HttpServer {
    bind_address: String,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(
        bind_address: String,
        leader: LeaderNode,
        follower: FollowerNode,
        store: Arc<VersionedStore>,
    ) -> Self {
        let state = Arc::new(AppState {
            node: Arc::clone(leader.node()),
            store,
            leader,
            follower,
        });

        Self { bind_address, state }
    }

    /// Wire a complete node from configuration: store, transport,
    /// broadcaster and both write paths
    pub fn from_config(config: &KvConfig) -> Result<Self> {
        let node = Arc::new(NodeState::from_config(config));
        let store = Arc::new(VersionedStore::new());

        let transport = HttpTransport::new(ReplicationConfig::from(config).timeout())?;
        let broadcaster = Broadcaster::new(Arc::new(transport), Arc::clone(node.partition()));

        let leader = LeaderNode::new(Arc::clone(&node), Arc::clone(&store), broadcaster);
        let follower = FollowerNode::new(node, Arc::clone(&store));

        Ok(Self::new(config.bind_address(), leader, follower, store))
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Create the router
    pub fn router(&self) -> Router {
        Self::create_router(Arc::clone(&self.state))
    }

    fn create_router(state: Arc<AppState>) -> Router {
        Router::new()
            // Client operations
            .route("/put", post(handle_put))
            .route("/get", get(handle_get))
            // Cluster-internal
            .route("/replicate", post(handle_replicate))
            // Status and admin
            .route("/status", get(handle_status))
            .route("/health", get(handle_health))
            .route("/partition", post(handle_partition))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve
    pub async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            "HTTP API for {} {} listening on {}",
            self.state.node.role(),
            self.state.node.id(),
            addr
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| Error::Network(format!("HTTP server error: {}", e)))?;

        Ok(())
    }
}

// ============ Request/Response Types ============

/// Client write request
#[derive(Debug, Deserialize, Serialize)]
pub struct PutRequest {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct GetParams {
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartitionParams {
    pub block: Option<String>,
    pub unblock: Option<String>,
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub id: String,
    pub role: NodeRole,
    pub mode: ReplicationMode,
    pub port: u16,
    pub peers: Vec<String>,
    pub data: BTreeMap<String, Record>,
    pub blocked: BTreeSet<String>,
}

/// Partition control response
#[derive(Debug, Serialize, Deserialize)]
pub struct PartitionResponse {
    pub blocked: BTreeSet<String>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub node_id: String,
    pub role: NodeRole,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============ Handlers ============

async fn handle_put(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PutRequest>, JsonRejection>,
) -> Response {
    // Role is checked before the body so followers never parse client writes
    if !state.node.is_leader() {
        return error_response(Error::NotLeader(state.node.id().to_string()));
    }

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.leader.write(req.key, req.value).await {
        Ok(receipt) => {
            let ack = WriteAck::from(&receipt);
            if let Replication::InFlight(pending) = receipt.replication {
                tracing::debug!(
                    "[req {}] acknowledged with {} deliveries in flight",
                    receipt.request_id,
                    pending.len()
                );
            }
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn handle_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetParams>,
) -> Response {
    let key = match params.key.filter(|k| !k.is_empty()) {
        Some(key) => key,
        None => return error_response(Error::InvalidRequest("missing key query param".into())),
    };

    match state.store.lookup(&key).await {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "key not found".to_string(),
                code: "KEY_NOT_FOUND".to_string(),
            }),
        )
            .into_response(),
    }
}

async fn handle_replicate(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ReplicateRequest>, JsonRejection>,
) -> Response {
    if state.node.is_leader() {
        return error_response(Error::NotFollower(state.node.id().to_string()));
    }

    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    match state.follower.apply(req).await {
        Ok(()) => Json(ReplicateResponse::ok()).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let node = &state.node;

    Json(StatusResponse {
        id: node.id().to_string(),
        role: node.role(),
        mode: node.mode(),
        port: node.port(),
        peers: node.peers().to_vec(),
        data: state.store.snapshot().await,
        blocked: node.partition().list().await,
    })
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        node_id: state.node.id().to_string(),
        role: state.node.role(),
    })
}

/// Simulate network partitions.
///
/// `POST /partition?block=http://follower1:8081` or
/// `POST /partition?unblock=follower1:8081`
async fn handle_partition(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PartitionParams>,
) -> Response {
    if !state.node.is_leader() {
        return error_response(Error::NotLeader(state.node.id().to_string()));
    }

    let partition = state.node.partition();

    if let Some(peer) = params.block.as_deref().and_then(normalize_peer) {
        if partition.block(&peer).await {
            tracing::warn!("Blocking replication to {}", peer);
        }
    }
    if let Some(peer) = params.unblock.as_deref().and_then(normalize_peer) {
        if partition.unblock(&peer).await {
            tracing::warn!("Unblocking replication to {}", peer);
        }
    }

    Json(PartitionResponse {
        blocked: partition.list().await,
    })
    .into_response()
}

// ============ Helpers ============

fn invalid_body(rejection: JsonRejection) -> Response {
    error_response(Error::InvalidRequest(format!(
        "invalid request body: {}",
        rejection.body_text()
    )))
}

/// Map an error onto an HTTP status and machine-readable code
fn error_response(err: Error) -> Response {
    let (status, code) = match &err {
        Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
        Error::NotLeader(_) => (StatusCode::FORBIDDEN, "NOT_LEADER"),
        Error::NotFollower(_) => (StatusCode::FORBIDDEN, "NOT_FOLLOWER"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
    };

    if err.is_client_error() {
        tracing::warn!("HTTP {}: {}", status.as_u16(), err);
    } else {
        tracing::error!("HTTP {}: {}", status.as_u16(), err);
    }

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}
