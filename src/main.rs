use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use quorum_lite::config::{ElectionConfig, NodeConfig, PortRange};
use quorum_lite::discovery::bind_addr;
use quorum_lite::election::node::NodeStatus;
use quorum_lite::election::PeerClient;
use quorum_lite::shutdown::install_shutdown_handler;
use quorum_lite::Node;

#[derive(Parser, Debug)]
#[command(name = "quorum-lite")]
#[command(version)]
#[command(about = "Leader election among local peers with randomized timeouts and majority votes")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start a node
    Server(ServerArgs),

    /// Cluster inspection commands
    Cluster {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: ClusterCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Host every node of the local cluster listens on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// First port of the cluster's port range
    #[arg(long, default_value = "8000")]
    min_port: u16,

    /// Number of ports (and nodes) in the range
    #[arg(long, default_value = "3")]
    count: u16,

    /// Listen on this exact address instead of scanning the range
    #[arg(long, requires = "peers")]
    listen: Option<String>,

    /// Every cluster address (comma-separated host:port), used with --listen
    #[arg(long, requires = "listen")]
    peers: Option<String>,

    #[command(flatten)]
    timing: TimingArgs,
}

#[derive(Parser, Debug)]
struct TimingArgs {
    /// Lower bound of the random election timeout
    #[arg(long, default_value = "100")]
    election_timeout_min_ms: u64,

    /// Upper bound (exclusive) of the random election timeout
    #[arg(long, default_value = "200")]
    election_timeout_max_ms: u64,

    /// Wait shared by all roles before checking for a leader
    #[arg(long, default_value = "1000")]
    heartbeat_window_ms: u64,

    /// Extra wait before starting an election
    #[arg(long, default_value = "2000")]
    pre_election_wait_ms: u64,

    /// Per-peer timeout of a quorum ping
    #[arg(long, default_value = "33")]
    ping_timeout_ms: u64,

    /// Per-peer timeout of a vote request
    #[arg(long, default_value = "50")]
    vote_timeout_ms: u64,

    /// Upper bound on a leader heartbeat call
    #[arg(long, default_value = "1000")]
    announce_timeout_ms: u64,
}

impl TimingArgs {
    fn to_config(&self) -> ElectionConfig {
        ElectionConfig {
            election_timeout_min_ms: self.election_timeout_min_ms,
            election_timeout_max_ms: self.election_timeout_max_ms,
            heartbeat_window_ms: self.heartbeat_window_ms,
            pre_election_wait_ms: self.pre_election_wait_ms,
            ping_timeout_ms: self.ping_timeout_ms,
            vote_timeout_ms: self.vote_timeout_ms,
            announce_timeout_ms: self.announce_timeout_ms,
        }
    }
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Node address to query (repeat for several nodes)
    #[arg(long, short = 'a', default_value = "127.0.0.1:8000")]
    addr: Vec<String>,

    /// Per-node request timeout
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum ClusterCommands {
    /// Show each node's role
    Status,
}

#[derive(Serialize)]
struct NodeStatusOutput {
    address: String,
    reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<NodeStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl NodeStatusOutput {
    fn new<E: std::fmt::Display>(address: &str, result: Result<NodeStatus, E>) -> Self {
        let (status, error) = match result {
            Ok(status) => (Some(status), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            address: address.to_string(),
            reachable: status.is_some(),
            status,
            error,
        }
    }

    fn table_row(&self) -> String {
        match &self.status {
            Some(s) => {
                let timeout_text = format!("{}ms", s.election_timeout_ms);
                format!(
                    "{:<25} {:<10} {:<12} {}",
                    self.address,
                    s.role.to_string(),
                    timeout_text,
                    s.peer_count
                )
            }
            None => format!("{:<25} {:<10} {:<12} -", self.address, "[-] down", "-"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_peers(peers_str: &str) -> Vec<String> {
    peers_str
        .split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let election = args.timing.to_config();

    let node = match (args.listen, args.peers) {
        (Some(listen), Some(peers)) => {
            let listener = bind_addr(&listen).await?;
            let config = NodeConfig {
                self_addr: listen,
                peers: parse_peers(&peers),
                election,
            };
            Node::new(config, listener)?
        }
        _ => {
            let range = PortRange::new(args.host, args.min_port, args.count);
            Node::bootstrap(&range, election).await?
        }
    };

    let election_node = node.election();
    tracing::info!(
        self_addr = %node.self_addr(),
        peers = ?election_node.peers(),
        election_timeout_ms = election_node.election_timeout().as_millis() as u64,
        "Starting quorum-lite node"
    );

    let shutdown = install_shutdown_handler();
    node.run(shutdown).await?;

    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn handle_cluster_status(args: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = PeerClient::new()?;
    let timeout = Duration::from_millis(args.timeout_ms);

    let mut nodes = Vec::with_capacity(args.addr.len());
    for addr in &args.addr {
        let result = client.status::<NodeStatus>(addr, timeout).await;
        if let Err(e) = &result {
            tracing::warn!(addr = %addr, error = %e, "Status request failed");
        }
        nodes.push(NodeStatusOutput::new(addr, result));
    }

    match args.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&nodes)?);
        }
        OutputFormat::Table => {
            println!("{:<25} {:<10} {:<12} PEERS", "ADDRESS", "ROLE", "TIMEOUT");
            println!("{}", "-".repeat(55));
            for node in &nodes {
                println!("{}", node.table_row());
            }

            let leaders = nodes
                .iter()
                .filter_map(|n| n.status.as_ref())
                .filter(|s| s.role == quorum_lite::election::Role::Leader)
                .count();
            println!();
            println!("Leaders: {}", leaders);
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Cluster { client, command } => match command {
            ClusterCommands::Status => {
                handle_cluster_status(&client).await?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peers() {
        assert_eq!(
            parse_peers("127.0.0.1:8000, 127.0.0.1:8001,,127.0.0.1:8002"),
            vec!["127.0.0.1:8000", "127.0.0.1:8001", "127.0.0.1:8002"]
        );
        assert!(parse_peers("").is_empty());
    }

    #[test]
    fn test_default_timings_validate() {
        let args = Args::parse_from(["quorum-lite", "server"]);
        let Commands::Server(server) = args.command else {
            panic!("expected server command");
        };
        assert!(server.timing.to_config().validate().is_ok());
        assert_eq!(server.min_port, 8000);
        assert_eq!(server.count, 3);
    }

    #[test]
    fn test_call_timeouts_are_configurable() {
        let args = Args::parse_from([
            "quorum-lite",
            "server",
            "--ping-timeout-ms",
            "40",
            "--vote-timeout-ms",
            "60",
            "--announce-timeout-ms",
            "500",
        ]);
        let Commands::Server(server) = args.command else {
            panic!("expected server command");
        };
        let config = server.timing.to_config();
        assert_eq!(config.ping_timeout_ms, 40);
        assert_eq!(config.vote_timeout_ms, 60);
        assert_eq!(config.announce_timeout_ms, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_call_timeouts_match_config_defaults() {
        let args = Args::parse_from(["quorum-lite", "server"]);
        let Commands::Server(server) = args.command else {
            panic!("expected server command");
        };
        let config = server.timing.to_config();
        let defaults = ElectionConfig::default();
        assert_eq!(config.ping_timeout_ms, defaults.ping_timeout_ms);
        assert_eq!(config.vote_timeout_ms, defaults.vote_timeout_ms);
        assert_eq!(config.announce_timeout_ms, defaults.announce_timeout_ms);
    }

    #[test]
    fn test_unreachable_node_reports_error() {
        let output =
            NodeStatusOutput::new("127.0.0.1:9", Err::<NodeStatus, _>("connection refused"));
        assert!(!output.reachable);

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["error"], "connection refused");
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_reachable_node_omits_error() {
        let status = NodeStatus {
            address: "127.0.0.1:8000".to_string(),
            role: quorum_lite::election::Role::Leader,
            election_timeout_ms: 150,
            peer_count: 3,
        };
        let output = NodeStatusOutput::new("127.0.0.1:8000", Ok::<_, String>(status));
        assert!(output.reachable);

        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["status"]["role"], "leader");

        assert_eq!(
            output.table_row(),
            format!("{:<25} {:<10} {:<12} 3", "127.0.0.1:8000", "leader", "150ms")
        );
    }

    #[test]
    fn test_down_node_table_row() {
        let output = NodeStatusOutput::new("127.0.0.1:9", Err::<NodeStatus, _>("refused"));
        let row = output.table_row();
        assert!(row.starts_with("127.0.0.1:9 "));
        assert!(row.contains("[-] down"));
        assert!(row.ends_with(" -"));
    }

    #[test]
    fn test_listen_requires_peers() {
        let parsed = Args::try_parse_from(["quorum-lite", "server", "--listen", "127.0.0.1:9000"]);
        assert!(parsed.is_err());
    }
}
