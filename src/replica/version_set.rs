//! Versioned entries and causally-concurrent version sets

use crate::common::utils::base64_bytes;
use crate::replica::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A value together with the context it was minted under.
///
/// Immutable once stored; superseded entries are removed, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedEntry {
    pub context: VectorClock,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl VersionedEntry {
    pub fn new(context: VectorClock, value: impl Into<Vec<u8>>) -> Self {
        Self {
            context,
            value: value.into(),
        }
    }
}

/// Outcome of merging one entry into a version set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Inserted; every entry it dominated was removed
    Accepted,
    /// An entry with an equal context is already present
    Redundant,
    /// An existing entry strictly dominates the incoming context
    Stale,
}

impl Reconcile {
    /// The replica holds the version after the merge
    pub fn is_held(self) -> bool {
        matches!(self, Reconcile::Accepted | Reconcile::Redundant)
    }
}

/// Entries for one key, pairwise causally concurrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionSet {
    entries: Vec<VersionedEntry>,
}

impl VersionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[VersionedEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VersionedEntry> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<VersionedEntry> {
        self.entries
    }

    /// Some stored entry strictly dominates `context`
    pub fn is_stale(&self, context: &VectorClock) -> bool {
        self.entries.iter().any(|e| context.less_than(&e.context))
    }

    pub fn contains_context(&self, context: &VectorClock) -> bool {
        self.entries.iter().any(|e| e.context.equals(context))
    }

    /// Drop every entry whose context is <= the new entry's, then insert it.
    ///
    /// Callers must have ruled out staleness first.
    pub(crate) fn supersede(&mut self, entry: VersionedEntry) {
        self.entries
            .retain(|e| !e.context.less_than_or_equal(&entry.context));
        self.entries.push(entry);
    }

    /// Drop every entry whose context is <= `covered`, then insert `entry`.
    pub(crate) fn replace_covered(&mut self, covered: &VectorClock, entry: VersionedEntry) {
        self.entries.retain(|e| !e.context.less_than_or_equal(covered));
        self.entries.push(entry);
    }

    /// Merge an entry that already carries its mint-time context.
    pub fn merge_entry(&mut self, entry: VersionedEntry) -> Reconcile {
        if self.is_stale(&entry.context) {
            return Reconcile::Stale;
        }
        if self.contains_context(&entry.context) {
            return Reconcile::Redundant;
        }
        self.supersede(entry);
        Reconcile::Accepted
    }

    /// Merge every entry of `other`, in order
    pub fn merge_all<I>(&mut self, other: I)
    where
        I: IntoIterator<Item = VersionedEntry>,
    {
        for entry in other {
            self.merge_entry(entry);
        }
    }

    /// Remove the entries whose contexts appear in `sent`; entries that
    /// arrived later are kept.
    pub fn acknowledge(&mut self, sent: &[VersionedEntry]) {
        self.entries
            .retain(|e| !sent.iter().any(|s| s.context.equals(&e.context)));
    }

    /// Pointwise merge of every context, for a follow-up write
    pub fn combined_context(&self) -> VectorClock {
        VectorClock::combined(self.entries.iter().map(|e| &e.context))
    }

    /// Deterministic byte-lexicographic order over values
    pub fn sort_by_value(&mut self) {
        self.entries.sort_by(|a, b| compare_values(&a.value, &b.value));
    }
}

/// Lexicographic byte order; a strict prefix sorts first
pub fn compare_values(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

impl From<Vec<VersionedEntry>> for VersionSet {
    /// Builds a set by merging the entries in order, so the result upholds
    /// the pairwise-concurrency invariant.
    fn from(entries: Vec<VersionedEntry>) -> Self {
        let mut set = Self::new();
        set.merge_all(entries);
        set
    }
}

impl IntoIterator for VersionSet {
    type Item = VersionedEntry;
    type IntoIter = std::vec::IntoIter<VersionedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a VersionSet {
    type Item = &'a VersionedEntry;
    type IntoIter = std::slice::Iter<'a, VersionedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vc(entries: &[(&str, u64)]) -> VectorClock {
        entries.iter().map(|(id, n)| (*id, *n)).collect()
    }

    fn entry(clock: &[(&str, u64)], value: &str) -> VersionedEntry {
        VersionedEntry::new(vc(clock), value.as_bytes())
    }

    #[test]
    fn test_merge_into_empty() {
        let mut set = VersionSet::new();
        assert_eq!(set.merge_entry(entry(&[("a", 1)], "x")), Reconcile::Accepted);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_newer_entry_supersedes() {
        let mut set = VersionSet::new();
        set.merge_entry(entry(&[("a", 1)], "old"));
        assert_eq!(
            set.merge_entry(entry(&[("a", 2)], "new")),
            Reconcile::Accepted
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].value, b"new");
    }

    #[test]
    fn test_stale_entry_rejected_without_mutation() {
        let mut set = VersionSet::new();
        set.merge_entry(entry(&[("a", 2)], "new"));
        let before = set.clone();
        assert_eq!(set.merge_entry(entry(&[("a", 1)], "old")), Reconcile::Stale);
        assert_eq!(set, before);
    }

    #[test]
    fn test_equal_context_is_redundant() {
        let mut set = VersionSet::new();
        set.merge_entry(entry(&[("a", 1)], "x"));
        assert_eq!(
            set.merge_entry(entry(&[("a", 1)], "x")),
            Reconcile::Redundant
        );
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_concurrent_entries_coexist() {
        let mut set = VersionSet::new();
        set.merge_entry(entry(&[("a", 1)], "abc"));
        assert_eq!(set.merge_entry(entry(&[("b", 1)], "bc")), Reconcile::Accepted);
        assert_eq!(set.len(), 2);

        // Dominates both siblings
        assert_eq!(
            set.merge_entry(entry(&[("a", 1), ("b", 1), ("c", 1)], "merged")),
            Reconcile::Accepted
        );
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].value, b"merged");
    }

    #[test]
    fn test_acknowledge_keeps_later_entries() {
        let mut set = VersionSet::new();
        set.merge_entry(entry(&[("a", 1)], "sent"));
        let sent = set.entries().to_vec();
        set.merge_entry(entry(&[("b", 1)], "later"));

        set.acknowledge(&sent);
        assert_eq!(set.len(), 1);
        assert_eq!(set.entries()[0].value, b"later");
    }

    #[test]
    fn test_sort_by_value() {
        let mut set = VersionSet::from(vec![
            entry(&[("c", 1)], "bc"),
            entry(&[("a", 1)], "abc"),
            entry(&[("b", 1)], "ab"),
        ]);
        set.sort_by_value();
        let values: Vec<&[u8]> = set.iter().map(|e| e.value.as_slice()).collect();
        assert_eq!(values, vec![&b"ab"[..], &b"abc"[..], &b"bc"[..]]);
    }

    #[test]
    fn test_combined_context() {
        let set = VersionSet::from(vec![
            entry(&[("a", 2)], "x"),
            entry(&[("b", 1)], "y"),
        ]);
        assert_eq!(set.combined_context(), vc(&[("a", 2), ("b", 1)]));
    }
}
