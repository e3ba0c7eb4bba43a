//! Gossip cycle: flush the pending-gossip ledger to reachable peers

use crate::common::Result;
use crate::coordinator::node::DynamoServer;
use crate::transport::messages::BatchReplicateArgs;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one gossip cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipReport {
    pub peers_contacted: usize,
    pub peers_skipped: usize,
    pub keys_flushed: usize,
    pub keys_failed: usize,
}

impl DynamoServer {
    /// Run one gossip cycle.
    ///
    /// Each peer is probed first and skipped when unreachable. For a
    /// reachable peer every pending key is sent as one BatchReplicate; a
    /// successful call clears exactly the entries that were sent, anything
    /// recorded while the call was in flight stays pending.
    pub async fn gossip(&self) -> Result<GossipReport> {
        let (peers, generation) = {
            let inner = self.lock_alive()?;
            (inner.peers(self.self_node()), inner.generation)
        };
        self.metrics().gossip_rounds.inc();

        let mut report = GossipReport::default();
        for (slot, peer) in peers {
            if let Err(e) = self.transport.ping(&peer).await {
                report.peers_skipped += 1;
                self.metrics().gossip_peers_skipped.inc();
                tracing::warn!(peer = %peer, "Gossip skipping unreachable peer: {}", e);
                continue;
            }
            report.peers_contacted += 1;

            let pending = {
                let inner = self.state.lock();
                if inner.generation != generation {
                    tracing::info!("Preference list changed, ending gossip cycle early");
                    break;
                }
                inner.ledger.pending(slot)
            };

            for (key, entries) in pending {
                let args = BatchReplicateArgs { key, entries };
                match self.transport.batch_replicate(&peer, &args).await {
                    Ok(true) => {
                        let mut inner = self.state.lock();
                        if inner.generation == generation {
                            inner.ledger.acknowledge(slot, &args.key, &args.entries);
                        }
                        report.keys_flushed += 1;
                        tracing::debug!(key = %args.key, peer = %peer, versions = args.entries.len(), "Gossip delivered");
                    }
                    Ok(false) => {
                        report.keys_failed += 1;
                        tracing::debug!(key = %args.key, peer = %peer, "Gossip batch refused");
                    }
                    Err(e) => {
                        report.keys_failed += 1;
                        self.metrics().peer_failures.inc();
                        tracing::warn!(key = %args.key, peer = %peer, "Gossip batch failed: {}", e);
                    }
                }
            }
        }

        self.metrics().gossip_keys_flushed.add(report.keys_flushed as u64);
        tracing::info!(
            contacted = report.peers_contacted,
            skipped = report.peers_skipped,
            flushed = report.keys_flushed,
            failed = report.keys_failed,
            "Gossip cycle complete"
        );
        Ok(report)
    }
}

/// Run a gossip cycle every `interval`, with up to 20% jitter so nodes
/// started together do not gossip in lockstep.
pub fn spawn_periodic_gossip(
    node: Arc<DynamoServer>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let jitter_cap = (interval.as_millis() as u64 / 5).max(1);
        loop {
            let jitter = Duration::from_millis(rand::random::<u64>() % jitter_cap);
            tokio::time::sleep(interval + jitter).await;

            if node.total_pending() == 0 {
                continue;
            }
            if let Err(e) = node.gossip().await {
                tracing::debug!("Periodic gossip skipped: {}", e);
            }
        }
    })
}
