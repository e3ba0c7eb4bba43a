//! Replica node binary

use clap::{Parser, Subcommand};
use dynamokv::common::{parse_duration, DynamoNode, NodeConfig};
use dynamokv::NodeServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dynamo-node")]
#[command(about = "dynamokv replica node")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a node
    Serve {
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Node ID (vector clock identifier)
        #[arg(long)]
        id: Option<String>,

        /// Bind address for HTTP
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Address peers use to reach this node, if different from --bind
        #[arg(long)]
        advertise: Option<DynamoNode>,

        /// Other replicas (comma-separated host:port); this node is placed first
        #[arg(long, value_delimiter = ',')]
        peers: Vec<DynamoNode>,

        /// Write quorum
        #[arg(long)]
        w: Option<usize>,

        /// Read quorum
        #[arg(long)]
        r: Option<usize>,

        /// Periodic gossip interval (e.g. "500ms", "5s"); off when omitted
        #[arg(long)]
        gossip_interval: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            id,
            bind,
            advertise,
            peers,
            w,
            r,
            gossip_interval,
        } => {
            // File and environment first, CLI flags take priority
            let mut node_config = NodeConfig::load(config.as_deref())?;
            if let Some(id) = id {
                node_config.node_id = id;
            }
            if let Some(bind) = bind {
                node_config.bind_addr = bind;
            }
            if advertise.is_some() {
                node_config.advertise = advertise;
            }
            if !peers.is_empty() {
                node_config.preference_list = peers;
            }
            if let Some(w) = w {
                node_config.write_quorum = w;
            }
            if let Some(r) = r {
                node_config.read_quorum = r;
            }
            if let Some(interval) = gossip_interval {
                node_config.gossip_interval_ms = Some(parse_duration(&interval)?.as_millis() as u64);
            }
            node_config.validate()?;

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| node_config.log_level.as_str().into()),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();

            NodeServer::new(node_config).serve().await?;
        }
    }

    Ok(())
}
