//! kvrepl Configuration
//!
//! Configuration structures for a kvrepl node, loaded from TOML and
//! optionally overridden from the command line.

use serde::{Deserialize, Serialize};

use crate::state::{NodeRole, ReplicationMode};

/// Main kvrepl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KvConfig {
    /// Node-specific configuration
    #[serde(default)]
    pub node: NodeConfig,

    /// Cluster configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier
    #[serde(default = "default_node_id")]
    pub id: String,

    /// Leader or follower
    #[serde(default = "default_role")]
    pub role: NodeRole,

    /// Replication mode (only used by a leader)
    #[serde(default = "default_mode")]
    pub mode: ReplicationMode,

    /// Host to bind the HTTP API on
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Peer addresses (followers, for a leader). Bare `host:port` is allowed.
    #[serde(default)]
    pub peers: Vec<String>,

    /// Per-delivery replication timeout in milliseconds
    #[serde(default = "default_replication_timeout_ms")]
    pub replication_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Values given on the command line, which win over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub id: Option<String>,
    pub role: Option<NodeRole>,
    pub mode: Option<ReplicationMode>,
    pub port: Option<u16>,
    /// Comma-separated peer list
    pub peers: Option<String>,
}

// Default value functions
fn default_node_id() -> String {
    "node-1".to_string()
}

fn default_role() -> NodeRole {
    NodeRole::Leader
}

fn default_mode() -> ReplicationMode {
    ReplicationMode::Sync
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_replication_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: default_node_id(),
            role: default_role(),
            mode: default_mode(),
            bind_host: default_bind_host(),
            port: default_port(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            replication_timeout_ms: default_replication_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl KvConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: KvConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> crate::Result<()> {
        if let Some(id) = overrides.id {
            self.node.id = id;
        }
        if let Some(role) = overrides.role {
            self.node.role = role;
        }
        if let Some(mode) = overrides.mode {
            self.node.mode = mode;
        }
        if let Some(port) = overrides.port {
            self.node.port = port;
        }
        if let Some(peers) = overrides.peers {
            self.cluster.peers = normalize_peers(&peers);
        }
        self.validate()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.id.trim().is_empty() {
            return Err(crate::Error::Config("node.id cannot be empty".into()));
        }

        if self.node.port == 0 {
            return Err(crate::Error::Config("node.port cannot be 0".into()));
        }

        if self.cluster.replication_timeout_ms == 0 {
            return Err(crate::Error::Config(
                "cluster.replication_timeout_ms must be positive".into(),
            ));
        }

        if self.cluster.peers.iter().any(|p| p.trim().is_empty()) {
            return Err(crate::Error::Config("cluster.peers contains an empty address".into()));
        }

        Ok(())
    }

    /// Normalized peer base URLs
    pub fn peers(&self) -> Vec<String> {
        self.cluster
            .peers
            .iter()
            .filter_map(|p| normalize_peer(p))
            .collect()
    }

    /// Address the HTTP API binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.node.bind_host, self.node.port)
    }
}

/// Normalize one peer address into a base URL.
///
/// Full `http(s)://` URLs are kept (minus a trailing slash); anything else,
/// typically `host:port`, gets the `http://` scheme. Blank input yields `None`.
pub fn normalize_peer(peer: &str) -> Option<String> {
    let peer = peer.trim().trim_end_matches('/');
    if peer.is_empty() {
        return None;
    }

    match reqwest::Url::parse(peer) {
        Ok(url) if url.host_str().is_some() && matches!(url.scheme(), "http" | "https") => {
            Some(peer.to_string())
        }
        _ => Some(format!("http://{}", peer)),
    }
}

/// Split a comma-separated peer list and normalize each entry
pub fn normalize_peers(peers_csv: &str) -> Vec<String> {
    peers_csv.split(',').filter_map(normalize_peer).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use crate::replication::ReplicationConfig;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[node]
id = "leader-1"
role = "leader"
mode = "async"
port = 8080

[cluster]
peers = ["follower1:8081", "http://follower2:8082"]
replication_timeout_ms = 2000
"#;

        let config = KvConfig::from_str(toml).unwrap();
        assert_eq!(config.node.id, "leader-1");
        assert_eq!(config.node.role, NodeRole::Leader);
        assert_eq!(config.node.mode, ReplicationMode::Async);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(ReplicationConfig::from(&config).timeout(), Duration::from_secs(2));
        assert_eq!(
            config.peers(),
            vec!["http://follower1:8081", "http://follower2:8082"]
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_defaults() {
        let config = KvConfig::from_str("").unwrap();
        assert_eq!(config.node.id, "node-1");
        assert_eq!(config.node.role, NodeRole::Leader);
        assert_eq!(config.node.mode, ReplicationMode::Sync);
        assert_eq!(config.node.port, 8080);
        assert!(config.peers().is_empty());
        assert_eq!(config.cluster.replication_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_config() {
        assert!(KvConfig::from_str("[node]\nid = \"\"").is_err());
        assert!(KvConfig::from_str("[node]\nport = 0").is_err());
        assert!(KvConfig::from_str("[node]\nrole = \"candidate\"").is_err());
        assert!(KvConfig::from_str("[cluster]\npeers = [\" \"]").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let mut config = KvConfig::from_str("[node]\nid = \"from-file\"\nport = 9000").unwrap();
        config
            .apply_overrides(ConfigOverrides {
                role: Some(NodeRole::Follower),
                port: Some(8081),
                peers: Some("a:1,b:2".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.node.id, "from-file");
        assert_eq!(config.node.role, NodeRole::Follower);
        assert_eq!(config.node.port, 8081);
        assert_eq!(config.peers(), vec!["http://a:1", "http://b:2"]);
    }

    #[test]
    fn test_normalize_peers() {
        assert_eq!(
            normalize_peers("follower1:8081, http://follower2:8082/ ,,127.0.0.1:9000"),
            vec![
                "http://follower1:8081",
                "http://follower2:8082",
                "http://127.0.0.1:9000",
            ]
        );
        assert!(normalize_peers("  ").is_empty());
        assert_eq!(normalize_peer("localhost:8081").as_deref(), Some("http://localhost:8081"));
        assert_eq!(normalize_peer("https://f1.example").as_deref(), Some("https://f1.example"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[node]\nid = \"f2\"\nrole = \"follower\"\nport = 8082").unwrap();

        let config = KvConfig::from_file(file.path()).unwrap();
        assert_eq!(config.node.id, "f2");
        assert_eq!(config.node.role, NodeRole::Follower);
    }
}
