//! Request/response bodies exchanged between nodes and clients

use crate::common::preference::DynamoNode;
use crate::common::utils::base64_bytes;
use crate::replica::{NodeState, VectorClock, VersionSet, VersionedEntry};
use serde::{Deserialize, Serialize};

/// Arguments of Put and Replicate: key, context and value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutArgs {
    pub key: String,
    #[serde(default)]
    pub context: VectorClock,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl PutArgs {
    /// Put with an empty context
    pub fn fresh(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::with_context(key, value, VectorClock::new())
    }

    pub fn with_context(
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        context: VectorClock,
    ) -> Self {
        Self {
            key: key.into(),
            context,
            value: value.into(),
        }
    }

    pub fn into_entry(self) -> (String, VersionedEntry) {
        (self.key, VersionedEntry::new(self.context, self.value))
    }
}

/// Bulk reconciliation of one key's pending fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReplicateArgs {
    pub key: String,
    pub entries: Vec<VersionedEntry>,
}

/// Result of a Get or NodeGet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamoResult {
    pub entries: VersionSet,
}

impl DynamoResult {
    /// Context dominating every returned version
    pub fn combined_context(&self) -> VectorClock {
        self.entries.combined_context()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashArgs {
    pub seconds: u64,
}

/// Payload of the SendPreferenceList call
pub type PreferenceListArgs = Vec<DynamoNode>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    /// False while inside a crash window; the process still answers
    pub available: bool,
    pub state: NodeState,
    pub keys: usize,
    pub pending_gossip: usize,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
