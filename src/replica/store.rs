//! Per-node key/value table of version sets

use crate::common::{Error, Result};
use crate::replica::vector_clock::VectorClock;
use crate::replica::version_set::{Reconcile, VersionSet, VersionedEntry};
use std::collections::HashMap;

/// Tally of a batch merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub redundant: usize,
    pub stale: usize,
}

impl BatchOutcome {
    fn record(&mut self, outcome: Reconcile) {
        match outcome {
            Reconcile::Accepted => self.accepted += 1,
            Reconcile::Redundant => self.redundant += 1,
            Reconcile::Stale => self.stale += 1,
        }
    }
}

/// In-memory mapping from key to its conflict set.
#[derive(Debug, Clone)]
pub struct VersionedStore {
    node_id: String,
    map: HashMap<String, VersionSet>,
}

impl VersionedStore {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            map: HashMap::new(),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Coordinator write: the context is incremented at this node.
    ///
    /// Every existing entry <= `context` is replaced; entries the client never
    /// saw survive even when the minted context covers them. Fails with
    /// [`Error::StaleWrite`] and leaves the set untouched when an existing
    /// entry strictly dominates `context`. Returns the minted context.
    pub fn put_local(
        &mut self,
        key: &str,
        context: &VectorClock,
        value: Vec<u8>,
    ) -> Result<VectorClock> {
        let set = self.map.entry(key.to_string()).or_default();
        if set.is_stale(context) {
            return Err(Error::StaleWrite {
                key: key.to_string(),
            });
        }
        let minted = context.incremented(&self.node_id);
        set.replace_covered(context, VersionedEntry::new(minted.clone(), value));
        Ok(minted)
    }

    /// Replica write: the entry keeps the context it was minted with.
    pub fn put_replicated(&mut self, key: &str, entry: VersionedEntry) -> Reconcile {
        let set = self.map.entry(key.to_string()).or_default();
        let outcome = set.merge_entry(entry);
        if set.is_empty() {
            self.map.remove(key);
        }
        outcome
    }

    /// Merge a whole version-set fragment (gossip delivery)
    pub fn batch_replicate<I>(&mut self, key: &str, entries: I) -> BatchOutcome
    where
        I: IntoIterator<Item = VersionedEntry>,
    {
        let mut outcome = BatchOutcome::default();
        let set = self.map.entry(key.to_string()).or_default();
        for entry in entries {
            outcome.record(set.merge_entry(entry));
        }
        if set.is_empty() {
            self.map.remove(key);
        }
        outcome
    }

    /// Copy of the version set for `key`; empty when absent
    pub fn get_local(&self, key: &str) -> VersionSet {
        self.map.get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
