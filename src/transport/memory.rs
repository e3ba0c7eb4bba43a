//! In-process transport connecting nodes that share one runtime

use crate::common::{DynamoNode, Error, Result};
use crate::coordinator::DynamoServer;
use crate::replica::VersionSet;
use crate::transport::messages::{BatchReplicateArgs, PutArgs};
use crate::transport::PeerTransport;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

/// Routes peer calls straight to registered [`DynamoServer`]s.
///
/// Nodes are held weakly so a cluster can be dropped as a whole. A
/// disconnected node behaves like a process that refuses connections.
#[derive(Default)]
pub struct InMemoryTransport {
    nodes: RwLock<HashMap<DynamoNode, Weak<DynamoServer>>>,
    disconnected: RwLock<HashSet<DynamoNode>>,
}

impl InMemoryTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, node: &Arc<DynamoServer>) {
        self.nodes
            .write()
            .insert(node.self_node().clone(), Arc::downgrade(node));
    }

    /// Make `node` refuse connections until [`reconnect`](Self::reconnect)
    pub fn disconnect(&self, node: &DynamoNode) {
        self.disconnected.write().insert(node.clone());
    }

    pub fn reconnect(&self, node: &DynamoNode) {
        self.disconnected.write().remove(node);
    }

    fn resolve(&self, peer: &DynamoNode) -> Result<Arc<DynamoServer>> {
        if self.disconnected.read().contains(peer) {
            return Err(Error::PeerUnreachable {
                peer: peer.to_string(),
                reason: "connection refused".into(),
            });
        }
        self.nodes
            .read()
            .get(peer)
            .and_then(Weak::upgrade)
            .ok_or_else(|| Error::PeerUnreachable {
                peer: peer.to_string(),
                reason: "no such node".into(),
            })
    }
}

#[async_trait]
impl PeerTransport for InMemoryTransport {
    async fn ping(&self, peer: &DynamoNode) -> Result<()> {
        self.resolve(peer).map(|_| ())
    }

    async fn replicate(&self, peer: &DynamoNode, args: &PutArgs) -> Result<bool> {
        self.resolve(peer)?.replicate(args.clone())
    }

    async fn batch_replicate(&self, peer: &DynamoNode, args: &BatchReplicateArgs) -> Result<bool> {
        self.resolve(peer)?.batch_replicate(args.clone())
    }

    async fn node_get(&self, peer: &DynamoNode, key: &str) -> Result<VersionSet> {
        self.resolve(peer)?.node_get(key)
    }
}
