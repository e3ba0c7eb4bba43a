//! Configuration for a dynamokv node

use crate::common::preference::{DynamoNode, PreferenceList};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix (e.g. `DYNAMO_WRITE_QUORUM=2`)
pub const ENV_PREFIX: &str = "DYNAMO";

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node ID, used as this replica's vector clock identifier
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Bind address for the HTTP API
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Advertised address when it differs from the bind address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertise: Option<DynamoNode>,

    /// Number of replicas a Put must reach (W)
    #[serde(default = "default_quorum")]
    pub write_quorum: usize,

    /// Number of replicas a Get reads from (R)
    #[serde(default = "default_quorum")]
    pub read_quorum: usize,

    /// Ordered replica list, self first by convention
    #[serde(default)]
    pub preference_list: Vec<DynamoNode>,

    /// Timeout for a single peer call
    #[serde(default = "default_rpc_timeout")]
    pub rpc_timeout_ms: u64,

    /// Periodic gossip interval; absent disables background gossip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gossip_interval_ms: Option<u64>,

    /// Request body limit for the HTTP API
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_node_id() -> String {
    "node-1".to_string()
}
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}
fn default_quorum() -> usize {
    3
}
fn default_rpc_timeout() -> u64 {
    2_000
}
fn default_max_body_bytes() -> usize {
    8 * 1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            bind_addr: default_bind_addr(),
            advertise: None,
            write_quorum: default_quorum(),
            read_quorum: default_quorum(),
            preference_list: Vec::new(),
            rpc_timeout_ms: default_rpc_timeout(),
            gossip_interval_ms: None,
            max_body_bytes: default_max_body_bytes(),
            log_level: default_log_level(),
        }
    }
}

impl NodeConfig {
    /// Load configuration: defaults, then the optional TOML file, then
    /// `DYNAMO_*` environment variables.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let cfg: NodeConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.node_id.trim().is_empty() {
            return Err(crate::Error::InvalidConfig("node_id cannot be empty".into()));
        }
        if self.write_quorum == 0 {
            return Err(crate::Error::InvalidConfig("write_quorum must be >= 1".into()));
        }
        if self.read_quorum == 0 {
            return Err(crate::Error::InvalidConfig("read_quorum must be >= 1".into()));
        }
        if self.gossip_interval_ms == Some(0) {
            return Err(crate::Error::InvalidConfig(
                "gossip_interval_ms must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    /// The address peers use to reach this node
    pub fn self_node(&self) -> DynamoNode {
        self.advertise.clone().unwrap_or_else(|| {
            DynamoNode::new(self.bind_addr.ip().to_string(), self.bind_addr.port())
        })
    }

    /// Configured preference list with this node placed first if missing
    pub fn preference_list(&self) -> PreferenceList {
        if self.preference_list.is_empty() {
            return PreferenceList::default();
        }
        let me = self.self_node();
        let mut nodes = self.preference_list.clone();
        if !nodes.contains(&me) {
            nodes.insert(0, me);
        }
        PreferenceList::new(nodes)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    pub fn gossip_interval(&self) -> Option<Duration> {
        self.gossip_interval_ms.map(Duration::from_millis)
    }
}
