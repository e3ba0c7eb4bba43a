//! Peer transport
//!
//! The replication engine only sees [`PeerTransport`]; the HTTP
//! implementation talks to remote nodes, the in-memory one wires nodes of a
//! single process together for tests and simulations.

pub mod http;
pub mod memory;
pub mod messages;

pub use http::{DynamoClient, HttpTransport};
pub use memory::InMemoryTransport;
pub use messages::{BatchReplicateArgs, DynamoResult, PutArgs};

use crate::common::{DynamoNode, Result};
use crate::replica::VersionSet;
use async_trait::async_trait;

/// Remote calls a node issues against its peers.
///
/// An `Err` means the peer could not be reached or is crashed; callers treat
/// it as a missing vote, never as a failure of the whole operation.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Connection probe used by gossip before flushing a slot
    async fn ping(&self, peer: &DynamoNode) -> Result<()>;

    /// Single-entry replica write; `Ok(false)` when the peer rejected it as stale
    async fn replicate(&self, peer: &DynamoNode, args: &PutArgs) -> Result<bool>;

    /// Version-set fragment delivery
    async fn batch_replicate(&self, peer: &DynamoNode, args: &BatchReplicateArgs) -> Result<bool>;

    /// Raw local read on the peer
    async fn node_get(&self, peer: &DynamoNode, key: &str) -> Result<VersionSet>;
}
