//! CLI for talking to a node

use clap::{Parser, Subcommand};
use dynamokv::common::{parse_duration, DynamoNode};
use dynamokv::transport::DynamoClient;
use dynamokv::VectorClock;

#[derive(Parser)]
#[command(name = "dynamo")]
#[command(about = "dynamokv client CLI")]
#[command(version)]
struct Cli {
    /// Node URL
    #[arg(long, default_value = "http://127.0.0.1:7000")]
    node: String,

    /// Request timeout (e.g. "2s")
    #[arg(long, default_value = "5s")]
    timeout: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quorum write
    Put {
        /// Key
        key: String,

        /// Value (UTF-8)
        value: String,

        /// Context as JSON, e.g. '{"n1":2}'; use "latest" to read and merge first
        #[arg(long)]
        context: Option<String>,
    },

    /// Quorum read
    Get {
        /// Key
        key: String,
    },

    /// Trigger one gossip cycle
    Gossip,

    /// Take the node down for a while
    Crash {
        /// Seconds of unavailability
        seconds: u64,
    },

    /// Install the preference list (comma-separated host:port)
    PreferenceList {
        #[arg(value_delimiter = ',')]
        nodes: Vec<DynamoNode>,
    },

    /// Node health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let client = DynamoClient::new(&cli.node, parse_duration(&cli.timeout)?)?;

    match cli.command {
        Commands::Put {
            key,
            value,
            context,
        } => {
            let context = match context.as_deref() {
                None => VectorClock::new(),
                Some("latest") => client.get(&key).await?.combined_context(),
                Some(json) => serde_json::from_str(json)?,
            };
            let success = client.put(&key, context.clone(), value.into_bytes()).await?;
            println!("PUT {} context={} success={}", key, context, success);
        }

        Commands::Get { key } => {
            let result = client.get(&key).await?;
            if result.entries.is_empty() {
                println!("{}: not found", key);
            }
            for entry in result.entries.iter() {
                println!(
                    "{} {}",
                    entry.context,
                    String::from_utf8_lossy(&entry.value)
                );
            }
            if result.entries.len() > 1 {
                println!("conflict: merge with context {}", result.combined_context());
            }
        }

        Commands::Gossip => {
            let report = client.gossip().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Crash { seconds } => {
            let crashed = client.crash(seconds).await?;
            if crashed {
                println!("Node down for {}s", seconds);
            } else {
                println!("Node already down");
            }
        }

        Commands::PreferenceList { nodes } => {
            client.send_preference_list(&nodes).await?;
            println!("Preference list installed ({} replicas)", nodes.len());
        }

        Commands::Health => {
            let health = client.health().await?;
            println!("Node: {}", health.node_id);
            println!("  State: {}", health.state);
            println!("  Keys: {}", health.keys);
            println!("  Pending gossip: {}", health.pending_gossip);
            println!("  Version: {}", health.version);
        }
    }

    Ok(())
}
