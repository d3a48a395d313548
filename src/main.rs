//! kvrepl - Leader-Driven Replicated Key-Value Store
//!
//! Runs a single leader or follower node behind an HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvrepl::api::HttpServer;
use kvrepl::config::{ConfigOverrides, KvConfig};
use kvrepl::error::{Error, Result};
use kvrepl::state::{NodeRole, NodeState, ReplicationMode};

/// kvrepl - Leader-driven replicated key-value store
#[derive(Parser)]
#[command(name = "kvrepl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (optional; flags alone are enough)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node
    Start {
        /// Node ID
        #[arg(long)]
        id: Option<String>,

        /// leader|follower
        #[arg(long)]
        role: Option<NodeRole>,

        /// sync|async (leader only)
        #[arg(long)]
        mode: Option<ReplicationMode>,

        /// HTTP port
        #[arg(long)]
        port: Option<u16>,

        /// Comma-separated peer base URLs (followers, for a leader)
        #[arg(long)]
        peers: Option<String>,
    },

    /// Query a node's status
    Status {
        /// Node address to query
        #[arg(short, long, default_value = "localhost:8080")]
        address: String,
    },

    /// Write a configuration template
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "kvrepl.toml")]
        output: PathBuf,

        /// Node ID
        #[arg(long, default_value = "node-1")]
        node_id: String,
    },

    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { id, role, mode, port, peers } => {
            let overrides = ConfigOverrides { id, role, mode, port, peers };
            run_start(cli.config, cli.log_level, overrides).await
        }
        Commands::Status { address } => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"));
            run_status(address).await
        }
        Commands::Init { output, node_id } => run_init(output, node_id),
        Commands::Validate => run_validate(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load the config file if one was given, otherwise start from defaults
fn load_config(path: Option<&PathBuf>) -> Result<KvConfig> {
    match path {
        Some(path) => KvConfig::from_file(path),
        None => Ok(KvConfig::default()),
    }
}

/// Start a node and serve until Ctrl+C
async fn run_start(
    config_path: Option<PathBuf>,
    log_level: Option<String>,
    overrides: ConfigOverrides,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    config.apply_overrides(overrides)?;

    init_logging(log_level.as_deref().unwrap_or(&config.logging.level));

    if config.node.role == NodeRole::Follower && !config.cluster.peers.is_empty() {
        tracing::warn!(
            "Ignoring {} configured peers: followers do not replicate",
            config.cluster.peers.len()
        );
    }

    let node = NodeState::from_config(&config);
    tracing::info!(
        "Starting {} {} on {} mode={} peers={:?}",
        node.role(),
        node.id(),
        config.bind_address(),
        node.mode(),
        node.peers()
    );

    let server = HttpServer::from_config(&config)?;

    tokio::select! {
        result = server.start() => {
            if let Err(e) = result {
                tracing::error!("HTTP server error: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!("kvrepl shutdown complete");
    Ok(())
}

/// Print a node's status
async fn run_status(address: String) -> Result<()> {
    let base = kvrepl::config::normalize_peer(&address)
        .ok_or_else(|| Error::Config("address cannot be empty".into()))?;
    let url = format!("{}/status", base);

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Network(e.to_string()))?;
    let status: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf, node_id: String) -> Result<()> {
    let config_content = format!(r#"# kvrepl Configuration
# Generated configuration file

[node]
id = "{node_id}"
# leader | follower
role = "leader"
# sync | async (leader only)
mode = "sync"
bind_host = "0.0.0.0"
port = 8080

[cluster]
# Followers this leader replicates to; bare host:port means http://host:port
peers = []
# peers = ["follower1:8081", "follower2:8082"]
replication_timeout_ms = 5000

[logging]
level = "info"
"#);

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: kvrepl --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: Option<PathBuf>) -> Result<()> {
    let path = config_path.ok_or_else(|| Error::Config("--config is required".into()))?;

    match KvConfig::from_file(&path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Node ID:   {}", config.node.id);
            println!("  Role:      {}", config.node.role);
            println!("  Mode:      {}", config.node.mode);
            println!("  Bind:      {}", config.bind_address());
            println!("  Peers:     {:?}", config.peers());
            println!("  Timeout:   {} ms", config.cluster.replication_timeout_ms);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}
