//! kvrepl Error Types

use thiserror::Error;

/// Result type alias for kvrepl operations
pub type Result<T> = std::result::Result<T, Error>;

/// kvrepl error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not a leader: node {0} does not accept client writes")]
    NotLeader(String),

    #[error("Not a follower: node {0} does not accept replicated writes")]
    NotFollower(String),

    // Delivery errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Connection failed to {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Connection timeout to {0}")]
    ConnectionTimeout(String),

    #[error("Peer {address} rejected replication with status {status}")]
    PeerRejected { address: String, status: u16 },

    // Encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error was caused by the caller's request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_) | Error::NotLeader(_) | Error::NotFollower(_)
        )
    }

    /// Check if this error came from delivering a write to a peer
    pub fn is_delivery_error(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::ConnectionFailed { .. }
                | Error::ConnectionTimeout(_)
                | Error::PeerRejected { .. }
        )
    }
}
