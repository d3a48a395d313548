//! Replication Transport
//!
//! Delivers a single replicated write to a single peer over HTTP.

use std::time::Duration;
use async_trait::async_trait;

use super::protocol::{ReplicateRequest, REPLICATE_PATH};
use crate::error::{Error, Result};

/// One delivery attempt of one write to one peer
///
/// Implementations make at most one attempt per call and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, peer: &str, request: &ReplicateRequest) -> Result<()>;
}

/// JSON-over-HTTP transport to a follower's `/replicate` endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose every delivery is bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, peer: &str, request: &ReplicateRequest) -> Result<()> {
        let url = format!("{}{}", peer, REPLICATE_PATH);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| classify(peer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::PeerRejected {
                address: peer.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

/// Map a reqwest failure onto the delivery error taxonomy
fn classify(peer: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::ConnectionTimeout(peer.to_string())
    } else if err.is_connect() {
        Error::ConnectionFailed {
            address: peer.to_string(),
            reason: err.to_string(),
        }
    } else {
        Error::Network(format!("post to {} failed: {}", peer, err))
    }
}
