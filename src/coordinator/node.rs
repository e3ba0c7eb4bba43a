//! Replica node: quorum Put/Get coordination and the peer-facing operations
//!
//! All per-node state lives behind one lock that is held only around
//! in-memory work. Remote calls are issued in preference-list order with the
//! lock released.

use crate::common::metrics::NodeMetrics;
use crate::common::{validate_key, DynamoNode, Error, NodeConfig, PreferenceList, Result};
use crate::replica::{
    NodeAvailability, NodeState, PendingGossipLedger, Reconcile, VersionSet, VersionedEntry,
    VersionedStore,
};
use crate::transport::messages::{BatchReplicateArgs, PutArgs};
use crate::transport::PeerTransport;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

/// Mutable state of one node
pub(crate) struct NodeInner {
    pub(crate) store: VersionedStore,
    pub(crate) ledger: PendingGossipLedger,
    pub(crate) availability: NodeAvailability,
    pub(crate) preference_list: PreferenceList,
    /// Bumped on every SendPreferenceList; ledger slot indices are only
    /// meaningful within one generation
    pub(crate) generation: u64,
}

impl NodeInner {
    /// Peers of `me` in preference order, with their slot indices
    pub(crate) fn peers(&self, me: &DynamoNode) -> Vec<(usize, DynamoNode)> {
        self.preference_list
            .peers(me)
            .map(|(slot, node)| (slot, node.clone()))
            .collect()
    }
}

/// One replica of the store
pub struct DynamoServer {
    node_id: String,
    self_node: DynamoNode,
    write_quorum: usize,
    read_quorum: usize,
    pub(crate) state: Mutex<NodeInner>,
    pub(crate) transport: Arc<dyn PeerTransport>,
    metrics: NodeMetrics,
}

impl DynamoServer {
    pub fn new(
        node_id: impl Into<String>,
        self_node: DynamoNode,
        write_quorum: usize,
        read_quorum: usize,
        transport: Arc<dyn PeerTransport>,
    ) -> Result<Self> {
        let node_id = node_id.into();
        if node_id.is_empty() {
            return Err(Error::InvalidConfig("node id cannot be empty".into()));
        }
        if write_quorum == 0 || read_quorum == 0 {
            return Err(Error::InvalidConfig(format!(
                "quorum sizes must be >= 1 (W={}, R={})",
                write_quorum, read_quorum
            )));
        }

        Ok(Self {
            state: Mutex::new(NodeInner {
                store: VersionedStore::new(node_id.clone()),
                ledger: PendingGossipLedger::default(),
                availability: NodeAvailability::new(),
                preference_list: PreferenceList::default(),
                generation: 0,
            }),
            node_id,
            self_node,
            write_quorum,
            read_quorum,
            transport,
            metrics: NodeMetrics::new(),
        })
    }

    /// Build a node from configuration, installing the configured preference list
    pub fn from_config(config: &NodeConfig, transport: Arc<dyn PeerTransport>) -> Result<Self> {
        config.validate()?;
        let node = Self::new(
            config.node_id.clone(),
            config.self_node(),
            config.write_quorum,
            config.read_quorum,
            transport,
        )?;
        let list = config.preference_list();
        if !list.is_empty() {
            node.send_preference_list(list.nodes().to_vec());
        }
        Ok(node)
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn self_node(&self) -> &DynamoNode {
        &self.self_node
    }

    pub fn write_quorum(&self) -> usize {
        self.write_quorum
    }

    pub fn read_quorum(&self) -> usize {
        self.read_quorum
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Lock the node state, refusing if the node is inside a crash window
    pub(crate) fn lock_alive(&self) -> Result<MutexGuard<'_, NodeInner>> {
        let mut inner = self.state.lock();
        if !inner.availability.is_alive() {
            self.metrics.unavailable_rejections.inc();
            tracing::debug!(
                remaining = ?inner.availability.remaining(),
                "Refusing request while crashed"
            );
            return Err(Error::NodeUnavailable(self.node_id.clone()));
        }
        Ok(inner)
    }

    // ------------------------------------------------------------------
    // Client-facing
    // ------------------------------------------------------------------

    /// Quorum write.
    ///
    /// The write is applied locally with the context incremented at this
    /// node, then forwarded to peers in preference order until W replicas
    /// hold it. Every peer that does not take the write, including those
    /// never contacted because quorum was already reached, gets it queued in
    /// the pending-gossip ledger. A locally stale write is not forwarded.
    pub async fn put(&self, args: PutArgs) -> Result<bool> {
        validate_key(&args.key)?;
        self.metrics.puts_total.inc();

        let (key, entry, peers, generation) = {
            let mut inner = self.lock_alive()?;
            let minted = match inner.store.put_local(&args.key, &args.context, args.value.clone()) {
                Ok(minted) => minted,
                Err(Error::StaleWrite { key }) => {
                    self.metrics.puts_stale.inc();
                    tracing::debug!(key = %key, context = %args.context, "Local write is stale, not replicating");
                    return Ok(false);
                }
                Err(e) => return Err(e),
            };
            let peers = inner.peers(&self.self_node);
            (args.key, VersionedEntry::new(minted, args.value), peers, inner.generation)
        };

        let forwarded = PutArgs::with_context(key.clone(), entry.value.clone(), entry.context.clone());
        let mut votes = 1;
        let mut missed = Vec::new();

        for (slot, peer) in peers {
            if votes >= self.write_quorum {
                missed.push(slot);
                continue;
            }
            match self.transport.replicate(&peer, &forwarded).await {
                Ok(true) => {
                    votes += 1;
                    tracing::debug!(key = %key, peer = %peer, votes, "Replica accepted write");
                }
                Ok(false) => {
                    tracing::debug!(key = %key, peer = %peer, "Replica rejected write as stale");
                    missed.push(slot);
                }
                Err(e) if e.is_peer_failure() => {
                    self.metrics.peer_failures.inc();
                    tracing::warn!(key = %key, peer = %peer, "Replicate failed: {}", e);
                    missed.push(slot);
                }
                Err(e) => {
                    tracing::error!(key = %key, peer = %peer, "Replicate error: {}", e);
                    missed.push(slot);
                }
            }
        }

        if !missed.is_empty() {
            let mut inner = self.state.lock();
            if inner.generation == generation {
                for slot in &missed {
                    inner.ledger.record(*slot, &key, entry.clone());
                }
                tracing::debug!(key = %key, slots = ?missed, "Queued write for gossip");
            } else {
                tracing::warn!(key = %key, "Preference list changed during put, gossip records dropped");
            }
        }

        let success = votes >= self.write_quorum;
        if success {
            self.metrics.puts_quorum_reached.inc();
        }
        tracing::info!(
            key = %key,
            context = %entry.context,
            votes,
            w = self.write_quorum,
            success,
            "Put complete"
        );
        Ok(success)
    }

    /// Quorum read with sloppy semantics.
    ///
    /// The local set is always included; the first R-1 peers in preference
    /// order are asked for theirs and unreachable ones are skipped without
    /// substitution. The merged set is sorted by value.
    pub async fn get(&self, key: &str) -> Result<VersionSet> {
        validate_key(key)?;
        self.metrics.gets_total.inc();

        let (mut merged, peers) = {
            let inner = self.lock_alive()?;
            let mut peers = inner.peers(&self.self_node);
            peers.truncate(self.read_quorum.saturating_sub(1));
            (inner.store.get_local(key), peers)
        };

        let mut sources = 1;
        for (_, peer) in peers {
            match self.transport.node_get(&peer, key).await {
                Ok(remote) => {
                    sources += 1;
                    merged.merge_all(remote);
                }
                Err(e) => {
                    if e.is_peer_failure() {
                        self.metrics.peer_failures.inc();
                    }
                    tracing::warn!(key = %key, peer = %peer, "NodeGet failed, skipping: {}", e);
                }
            }
        }

        merged.sort_by_value();
        tracing::debug!(key = %key, sources, versions = merged.len(), "Get complete");
        Ok(merged)
    }

    // ------------------------------------------------------------------
    // Peer-facing
    // ------------------------------------------------------------------

    /// Single-entry replica write; the context is stored as received
    pub fn replicate(&self, args: PutArgs) -> Result<bool> {
        validate_key(&args.key)?;
        let (key, entry) = args.into_entry();
        let outcome = self.lock_alive()?.store.put_replicated(&key, entry);
        match outcome {
            Reconcile::Stale => self.metrics.replicate_rejected.inc(),
            _ => self.metrics.replicate_accepted.inc(),
        }
        tracing::debug!(key = %key, ?outcome, "Replicate");
        Ok(outcome.is_held())
    }

    /// Merge a pending fragment delivered by gossip
    pub fn batch_replicate(&self, args: BatchReplicateArgs) -> Result<bool> {
        validate_key(&args.key)?;
        let outcome = self
            .lock_alive()?
            .store
            .batch_replicate(&args.key, args.entries);
        self.metrics.batch_replicate_total.inc();
        tracing::debug!(
            key = %args.key,
            accepted = outcome.accepted,
            redundant = outcome.redundant,
            stale = outcome.stale,
            "BatchReplicate"
        );
        Ok(true)
    }

    /// Raw local read, the remote half of a quorum Get
    pub fn node_get(&self, key: &str) -> Result<VersionSet> {
        validate_key(key)?;
        Ok(self.lock_alive()?.store.get_local(key))
    }

    // ------------------------------------------------------------------
    // Control
    // ------------------------------------------------------------------

    /// Start a crash window; false if the node is already crashed
    pub fn crash(&self, seconds: u64) -> bool {
        let started = self
            .state
            .lock()
            .availability
            .crash(Duration::from_secs(seconds));
        if started {
            self.metrics.crashes_total.inc();
            tracing::warn!(node_id = %self.node_id, seconds, "Node crashed");
        } else {
            tracing::debug!(node_id = %self.node_id, "Crash ignored, node already down");
        }
        started
    }

    /// Install a new preference list and reset the gossip ledger
    pub fn send_preference_list(&self, nodes: Vec<DynamoNode>) {
        let list = PreferenceList::new(nodes);
        let mut inner = self.state.lock();
        inner.ledger.reset(list.len());
        inner.generation += 1;
        tracing::info!(
            node_id = %self.node_id,
            replicas = list.len(),
            generation = inner.generation,
            "Preference list installed"
        );
        inner.preference_list = list;
    }

    pub fn preference_list(&self) -> PreferenceList {
        self.state.lock().preference_list.clone()
    }

    pub fn state(&self) -> NodeState {
        self.state.lock().availability.state()
    }

    /// Keys waiting for delivery to the replica at `slot`
    pub fn pending_keys(&self, slot: usize) -> usize {
        self.state.lock().ledger.pending_keys(slot)
    }

    /// Pending fragment for `key` destined to `slot`
    pub fn pending_for(&self, slot: usize, key: &str) -> Option<VersionSet> {
        self.state.lock().ledger.get(slot, key).cloned()
    }

    pub fn total_pending(&self) -> usize {
        self.state.lock().ledger.total_pending()
    }

    pub fn key_count(&self) -> usize {
        self.state.lock().store.len()
    }
}

impl std::fmt::Debug for DynamoServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoServer")
            .field("node_id", &self.node_id)
            .field("self_node", &self.self_node)
            .field("write_quorum", &self.write_quorum)
            .field("read_quorum", &self.read_quorum)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replica::VectorClock;
    use crate::transport::InMemoryTransport;

    fn node(id: &str, port: u16, w: usize, r: usize, transport: &Arc<InMemoryTransport>) -> Arc<DynamoServer> {
        let node = Arc::new(
            DynamoServer::new(id, DynamoNode::new("127.0.0.1", port), w, r, transport.clone()).unwrap(),
        );
        transport.register(&node);
        node
    }

    #[test]
    fn test_rejects_zero_quorum() {
        let transport = InMemoryTransport::new();
        let err = DynamoServer::new("n1", DynamoNode::new("127.0.0.1", 1), 0, 1, transport).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_single_node_put_get() {
        let transport = InMemoryTransport::new();
        let n1 = node("n1", 9000, 1, 1, &transport);

        assert!(n1.put(PutArgs::fresh("s1", "abc")).await.unwrap());
        let set = n1.get("s1").await.unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].value, b"abc");
    }

    #[tokio::test]
    async fn test_put_without_quorum_queues_everything() {
        let transport = InMemoryTransport::new();
        let n1 = node("n1", 9000, 2, 1, &transport);
        let missing = DynamoNode::new("127.0.0.1", 9001);
        n1.send_preference_list(vec![n1.self_node().clone(), missing]);

        assert!(!n1.put(PutArgs::fresh("s1", "abc")).await.unwrap());
        assert_eq!(n1.pending_keys(1), 1);
        assert_eq!(n1.pending_keys(0), 0);
        // Still stored locally
        assert_eq!(n1.node_get("s1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_local_write_is_not_forwarded() {
        let transport = InMemoryTransport::new();
        let n1 = node("n1", 9000, 2, 1, &transport);
        let n2 = node("n2", 9001, 2, 1, &transport);
        let list = vec![n1.self_node().clone(), n2.self_node().clone()];
        n1.send_preference_list(list.clone());
        n2.send_preference_list(list);

        assert!(n1.put(PutArgs::fresh("s1", "v1")).await.unwrap());
        let context = n1.get("s1").await.unwrap().combined_context();
        assert!(n1
            .put(PutArgs::with_context("s1", "v2", context))
            .await
            .unwrap());

        // The empty context is dominated by {n1:2}
        assert!(!n1.put(PutArgs::fresh("s1", "old")).await.unwrap());
        assert_eq!(n1.metrics().puts_stale.get(), 1);
        assert_eq!(n2.node_get("s1").unwrap().entries()[0].value, b"v2");
        assert_eq!(n1.total_pending(), 0);
    }

    #[tokio::test]
    async fn test_replicate_keeps_context() {
        let transport = InMemoryTransport::new();
        let n2 = node("n2", 9001, 1, 1, &transport);
        let context: VectorClock = [("n1", 3)].into_iter().collect();

        assert!(n2
            .replicate(PutArgs::with_context("s1", "abc", context.clone()))
            .unwrap());
        // Same version again is a no-op that still counts as held
        assert!(n2
            .replicate(PutArgs::with_context("s1", "abc", context.clone()))
            .unwrap());

        let set = n2.node_get("s1").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].context, context);
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_node_refuses_everything() {
        let transport = InMemoryTransport::new();
        let n1 = node("n1", 9000, 1, 1, &transport);

        assert!(n1.crash(5));
        assert!(!n1.crash(5));
        assert_eq!(n1.state(), NodeState::Crashed);

        let err = n1.put(PutArgs::fresh("s1", "abc")).await.unwrap_err();
        assert!(matches!(err, Error::NodeUnavailable(_)));
        assert!(matches!(n1.get("s1").await, Err(Error::NodeUnavailable(_))));
        assert!(n1.replicate(PutArgs::fresh("s1", "abc")).is_err());
        assert!(n1.node_get("s1").is_err());
        assert_eq!(n1.key_count(), 0);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(n1.state(), NodeState::Alive);
        assert!(n1.put(PutArgs::fresh("s1", "abc")).await.unwrap());
    }

    #[tokio::test]
    async fn test_send_preference_list_resets_ledger() {
        let transport = InMemoryTransport::new();
        let n1 = node("n1", 9000, 2, 1, &transport);
        n1.send_preference_list(vec![
            n1.self_node().clone(),
            DynamoNode::new("127.0.0.1", 9001),
        ]);
        n1.put(PutArgs::fresh("s1", "abc")).await.unwrap();
        assert_eq!(n1.total_pending(), 1);

        n1.send_preference_list(vec![n1.self_node().clone()]);
        assert_eq!(n1.total_pending(), 0);
        assert_eq!(n1.preference_list().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let transport = InMemoryTransport::new();
        let n1 = node("n1", 9000, 1, 1, &transport);
        assert!(matches!(
            n1.put(PutArgs::fresh("", "abc")).await,
            Err(Error::InvalidRequest(_))
        ));
    }
}
