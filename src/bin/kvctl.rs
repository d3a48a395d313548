//! kvctl - Command line tool for a kvrepl cluster
//!
//! Usage:
//!   kvctl put <key> <value>   - Write through the leader
//!   kvctl get <key>           - Read from any node
//!   kvctl status              - Show node status and data
//!   kvctl block <peer>        - Stop the leader replicating to a peer
//!   kvctl unblock <peer>      - Resume replication to a peer

use clap::{Parser, Subcommand};

use kvrepl::api::{ErrorResponse, PartitionResponse, PutRequest, StatusResponse};
use kvrepl::store::Record;

/// kvrepl Cluster Control Tool
#[derive(Parser)]
#[command(name = "kvctl")]
#[command(about = "Read, write and partition a kvrepl cluster", long_about = None)]
struct Cli {
    /// API endpoint of the node to talk to
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a key (leader only)
    Put { key: String, value: String },
    /// Read a key
    Get { key: String },
    /// Show status of the node
    Status,
    /// Block replication to a peer (leader only)
    Block { peer: String },
    /// Unblock replication to a peer (leader only)
    Unblock { peer: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let endpoint = kvrepl::config::normalize_peer(&cli.endpoint)
        .unwrap_or_else(|| "http://127.0.0.1:8080".to_string());

    let result = match cli.command {
        Commands::Put { key, value } => put(&endpoint, key, value).await,
        Commands::Get { key } => get(&endpoint, &key).await,
        Commands::Status => show_status(&endpoint).await,
        Commands::Block { peer } => partition(&endpoint, "block", &peer).await,
        Commands::Unblock { peer } => partition(&endpoint, "unblock", &peer).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ============ Commands ============

async fn put(endpoint: &str, key: String, value: String) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/put", endpoint);
    let client = reqwest::Client::new();

    let response = client
        .post(&url)
        .json(&PutRequest { key, value })
        .send()
        .await?;
    let response = check(response).await?;

    let ack: serde_json::Value = response.json().await?;
    println!(
        "ok  mode={}  req_id={}",
        ack["mode"].as_str().unwrap_or("?"),
        ack["req_id"].as_str().unwrap_or("?")
    );
    Ok(())
}

async fn get(endpoint: &str, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/get", endpoint);
    let client = reqwest::Client::new();

    let response = client.get(&url).query(&[("key", key)]).send().await?;
    if response.status() == reqwest::StatusCode::NOT_FOUND {
        println!("{}: (not found)", key);
        return Ok(());
    }
    let response = check(response).await?;

    let record: Record = response.json().await?;
    println!("{} = {}  (ts {})", record.key(), record.value(), record.timestamp());
    Ok(())
}

async fn show_status(endpoint: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/status", endpoint);
    let client = reqwest::Client::new();

    let response = check(client.get(&url).send().await?).await?;
    let status: StatusResponse = response.json().await?;

    println!();
    println!("kvrepl Node Status (kvctl v{})", env!("CARGO_PKG_VERSION"));
    println!("========================================");
    println!("Node:     {}", status.id);
    println!("Role:     {}", status.role);
    println!("Mode:     {}", status.mode);
    println!("Port:     {}", status.port);
    println!();

    if !status.peers.is_empty() {
        println!("{:<35} {:<10}", "PEER", "STATE");
        println!("{}", "-".repeat(45));
        for peer in &status.peers {
            let state = if status.blocked.contains(peer) { "BLOCKED" } else { "OK" };
            println!("{:<35} {:<10}", peer, state);
        }
        println!();
    }

    println!("{:<20} {:<20} {}", "KEY", "VALUE", "TIMESTAMP");
    println!("{}", "-".repeat(70));
    for record in status.data.values() {
        println!("{:<20} {:<20} {}", record.key(), record.value(), record.timestamp());
    }
    println!();
    Ok(())
}

async fn partition(
    endpoint: &str,
    action: &str,
    peer: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!("{}/partition", endpoint);
    let client = reqwest::Client::new();

    let response = client.post(&url).query(&[(action, peer)]).send().await?;
    let response = check(response).await?;

    let result: PartitionResponse = response.json().await?;
    if result.blocked.is_empty() {
        println!("No peers blocked");
    } else {
        println!("Blocked peers:");
        for peer in &result.blocked {
            println!("  {}", peer);
        }
    }
    Ok(())
}

// ============ Helpers ============

/// Turn a non-success response into an error carrying the server's message
async fn check(
    response: reqwest::Response,
) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => format!("{} ({})", body.error, body.code),
        Err(_) => status.to_string(),
    };
    Err(format!("API error {}: {}", status.as_u16(), message).into())
}
