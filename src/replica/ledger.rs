//! Pending-gossip ledger: writes not yet delivered to each replica

use crate::replica::version_set::{Reconcile, VersionSet, VersionedEntry};
use std::collections::HashMap;

/// Per-destination record of version-set fragments awaiting delivery.
///
/// Slots mirror preference-list indices. Fragments are reconciled with the
/// same causal rule as the store, so repeated writes to one key collapse to
/// the dominant versions.
#[derive(Debug, Clone, Default)]
pub struct PendingGossipLedger {
    slots: Vec<HashMap<String, VersionSet>>,
}

impl PendingGossipLedger {
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![HashMap::new(); slots],
        }
    }

    /// Drop everything and size the ledger for a new preference list
    pub fn reset(&mut self, slots: usize) {
        self.slots = vec![HashMap::new(); slots];
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Queue `entry` for delivery to `slot`; `None` if the slot does not exist
    pub fn record(&mut self, slot: usize, key: &str, entry: VersionedEntry) -> Option<Reconcile> {
        let pending = self.slots.get_mut(slot)?;
        let set = pending.entry(key.to_string()).or_default();
        let outcome = set.merge_entry(entry);
        if set.is_empty() {
            pending.remove(key);
        }
        Some(outcome)
    }

    /// Snapshot of every pending fragment for `slot`, ordered by key
    pub fn pending(&self, slot: usize) -> Vec<(String, Vec<VersionedEntry>)> {
        let mut out: Vec<(String, Vec<VersionedEntry>)> = self
            .slots
            .get(slot)
            .map(|pending| {
                pending
                    .iter()
                    .map(|(key, set)| (key.clone(), set.entries().to_vec()))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Clear the entries of `key` that were delivered to `slot`
    pub fn acknowledge(&mut self, slot: usize, key: &str, sent: &[VersionedEntry]) {
        let Some(pending) = self.slots.get_mut(slot) else {
            return;
        };
        if let Some(set) = pending.get_mut(key) {
            set.acknowledge(sent);
            if set.is_empty() {
                pending.remove(key);
            }
        }
    }

    /// Number of keys waiting for `slot`
    pub fn pending_keys(&self, slot: usize) -> usize {
        self.slots.get(slot).map_or(0, HashMap::len)
    }

    /// Pending fragment for one key and slot
    pub fn get(&self, slot: usize, key: &str) -> Option<&VersionSet> {
        self.slots.get(slot)?.get(key)
    }

    /// Keys pending across all slots
    pub fn total_pending(&self) -> usize {
        self.slots.iter().map(HashMap::len).sum()
    }
}
