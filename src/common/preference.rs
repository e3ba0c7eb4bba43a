//! Node addressing and the static preference list

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address/port identity of a replica
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DynamoNode {
    pub address: String,
    pub port: u16,
}

impl DynamoNode {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Base URL for HTTP peer calls
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

impl fmt::Display for DynamoNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

impl std::str::FromStr for DynamoNode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        let s = s
            .strip_prefix("http://")
            .unwrap_or(s)
            .trim_end_matches('/');
        let (address, port) = s
            .rsplit_once(':')
            .ok_or_else(|| crate::Error::InvalidConfig(format!("missing port in {}", s)))?;
        if address.is_empty() {
            return Err(crate::Error::InvalidConfig(format!("missing address in {}", s)));
        }
        let port = port
            .parse()
            .map_err(|_| crate::Error::InvalidConfig(format!("invalid port in {}", s)))?;
        Ok(Self::new(address, port))
    }
}

/// Ordered, fixed sequence of replicas.
///
/// Slot indices are stable for the lifetime of the list and are used to
/// address per-replica gossip state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceList {
    nodes: Vec<DynamoNode>,
}

impl PreferenceList {
    pub fn new(nodes: Vec<DynamoNode>) -> Self {
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[DynamoNode] {
        &self.nodes
    }

    pub fn get(&self, slot: usize) -> Option<&DynamoNode> {
        self.nodes.get(slot)
    }

    /// Slots of every replica except `me`, in preference order
    pub fn peers<'a>(
        &'a self,
        me: &'a DynamoNode,
    ) -> impl Iterator<Item = (usize, &'a DynamoNode)> + 'a {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| *node != me)
    }
}

impl From<Vec<DynamoNode>> for PreferenceList {
    fn from(nodes: Vec<DynamoNode>) -> Self {
        Self::new(nodes)
    }
}
