//! Vector clocks: per-replica counters establishing a partial causal order

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Mapping from replica identifier to a monotonically increasing counter.
///
/// An empty clock is the causal minimum. Counters are positive once present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>", into = "BTreeMap<String, u64>")]
pub struct VectorClock {
    counters: BTreeMap<String, u64>,
}

impl VectorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct replica identifiers present
    pub fn size(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Counter for a replica (0 when absent)
    pub fn get(&self, id: &str) -> u64 {
        self.counters.get(id).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counters.iter().map(|(id, n)| (id.as_str(), *n))
    }

    /// Record one more event at `id`
    pub fn increment(&mut self, id: &str) {
        *self.counters.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Copy of this clock incremented at `id`
    pub fn incremented(&self, id: &str) -> Self {
        let mut next = self.clone();
        next.increment(id);
        next
    }

    /// Every counter here is matched or exceeded by `other`.
    pub fn less_than_or_equal(&self, other: &VectorClock) -> bool {
        if self.size() > other.size() {
            return false;
        }
        self.counters
            .iter()
            .all(|(id, &n)| other.counters.get(id).is_some_and(|&m| m >= n))
    }

    /// `other` causally descends from this clock
    pub fn less_than(&self, other: &VectorClock) -> bool {
        self.less_than_or_equal(other) && self != other
    }

    pub fn equals(&self, other: &VectorClock) -> bool {
        self == other
    }

    /// Neither clock descends from the other
    pub fn concurrent(&self, other: &VectorClock) -> bool {
        !self.less_than_or_equal(other) && !other.less_than_or_equal(self)
    }

    /// Pointwise maximum over this clock and every clock in `clocks`
    pub fn combine<'a, I>(&mut self, clocks: I)
    where
        I: IntoIterator<Item = &'a VectorClock>,
    {
        for clock in clocks {
            for (id, &n) in &clock.counters {
                let current = self.counters.entry(id.clone()).or_insert(0);
                if *current < n {
                    *current = n;
                }
            }
        }
    }

    /// A fresh clock dominating every clock in `clocks`
    pub fn combined<'a, I>(clocks: I) -> Self
    where
        I: IntoIterator<Item = &'a VectorClock>,
    {
        let mut merged = Self::new();
        merged.combine(clocks);
        merged
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for VectorClock {
    fn from_iter<T: IntoIterator<Item = (S, u64)>>(iter: T) -> Self {
        Self {
            counters: iter
                .into_iter()
                .filter(|(_, n)| *n > 0)
                .map(|(id, n)| (id.into(), n))
                .collect(),
        }
    }
}

/// Zero counters are dropped so a decoded clock keeps counters positive
impl From<BTreeMap<String, u64>> for VectorClock {
    fn from(counters: BTreeMap<String, u64>) -> Self {
        counters.into_iter().collect()
    }
}

impl From<VectorClock> for BTreeMap<String, u64> {
    fn from(clock: VectorClock) -> Self {
        clock.counters
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (id, n)) in self.counters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", id, n)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vc(entries: &[(&str, u64)]) -> VectorClock {
        entries.iter().map(|(id, n)| (*id, *n)).collect()
    }

    #[test]
    fn test_empty_clocks_are_equal() {
        let a = VectorClock::new();
        let b = VectorClock::new();
        assert!(a.equals(&b));
        assert!(a.less_than_or_equal(&b));
        assert!(!a.less_than(&b));
        assert!(!a.concurrent(&b));
    }

    #[test]
    fn test_increment() {
        let mut clock = VectorClock::new();
        clock.increment("a");
        assert_eq!(clock.get("a"), 1);
        assert_eq!(clock.size(), 1);
        clock.increment("a");
        assert_eq!(clock.get("a"), 2);
        assert_eq!(clock.size(), 1);
        clock.increment("b");
        assert_eq!(clock.size(), 2);
        assert_eq!(clock.get("c"), 0);
    }

    #[test]
    fn test_descendant() {
        let mut c1 = VectorClock::new();
        let mut c2 = VectorClock::new();
        c1.increment("123");
        c2.increment("456");
        c2.increment("123");
        assert!(c1.less_than(&c2));
        assert!(!c2.less_than(&c1));

        c2.increment("7890");
        assert!(c1.less_than(&c2));

        c1.increment("12");
        assert!(c1.concurrent(&c2));
        assert!(c2.concurrent(&c1));
    }

    #[test]
    fn test_missing_identifier_is_not_le() {
        let a = vc(&[("a", 1)]);
        let b = vc(&[("b", 5)]);
        assert!(!a.less_than_or_equal(&b));
        assert!(a.concurrent(&b));
    }

    #[test]
    fn test_combine_dominates_inputs() {
        let mut a = vc(&[("a", 2), ("b", 1)]);
        let b = vc(&[("b", 3), ("c", 1)]);
        let before = a.clone();
        a.combine([&b]);
        assert_eq!(a, vc(&[("a", 2), ("b", 3), ("c", 1)]));
        assert!(before.less_than(&a));
        assert!(b.less_than(&a));
    }

    #[test]
    fn test_combined_of_nothing_is_empty() {
        let merged = VectorClock::combined(std::iter::empty());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(vc(&[("b", 2), ("a", 1)]).to_string(), "{a:1, b:2}");
        assert_eq!(VectorClock::new().to_string(), "{}");
    }

    #[test]
    fn test_serde_as_plain_map() {
        let clock = vc(&[("n1", 3)]);
        let json = serde_json::to_string(&clock).unwrap();
        assert_eq!(json, r#"{"n1":3}"#);
        let back: VectorClock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clock);
    }

    #[test]
    fn test_decoded_zero_counters_are_dropped() {
        let clock: VectorClock = serde_json::from_str(r#"{"n1":0,"n2":2}"#).unwrap();
        assert_eq!(clock, vc(&[("n2", 2)]));
        assert_eq!(clock.size(), 1);

        let empty: VectorClock = serde_json::from_str(r#"{"n1":0}"#).unwrap();
        assert!(empty.equals(&VectorClock::new()));
        assert!(!empty.concurrent(&VectorClock::new()));
    }
}
