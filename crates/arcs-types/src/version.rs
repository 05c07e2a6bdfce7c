//! Per-actor vector clock.
//!
//! A [`VersionMap`] records, for every actor that has written to a CRDT,
//! how many operations from that actor have been observed. Comparing two
//! maps tells whether one write causally follows another or whether they
//! were concurrent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Causality relationship between two version maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CausalOrder {
    /// First map happened before the second.
    Before,
    /// First map happened after the second.
    After,
    /// Neither map happened before the other.
    Concurrent,
    /// Maps are identical.
    Equal,
}

/// Vector clock keyed by actor name.
///
/// Entries are never zero: an actor appears only once it has ticked, so
/// structural equality coincides with causal equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionMap {
    clocks: BTreeMap<String, u64>,
}

impl VersionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logical time observed for `actor` (0 if never seen).
    pub fn get(&self, actor: &str) -> u64 {
        self.clocks.get(actor).copied().unwrap_or(0)
    }

    /// Iterate over `(actor, time)` pairs in actor order.
    pub fn actors(&self) -> impl Iterator<Item = (&str, u64)> {
        self.clocks.iter().map(|(actor, time)| (actor.as_str(), *time))
    }

    pub fn len(&self) -> usize {
        self.clocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Sum of all counters. Used as the first tie-breaker between
    /// concurrent writes.
    pub fn total(&self) -> u64 {
        self.clocks.values().sum()
    }

    /// Tick `actor` and return its new time.
    pub fn increment(&mut self, actor: &str) -> u64 {
        let entry = self.clocks.entry(actor.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Pointwise maximum with `other`.
    pub fn merge(&mut self, other: &Self) {
        for (actor, &time) in &other.clocks {
            let entry = self.clocks.entry(actor.clone()).or_insert(0);
            if time > *entry {
                *entry = time;
            }
        }
    }

    pub fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    pub fn compare(&self, other: &Self) -> CausalOrder {
        let mut self_ge = true;
        let mut other_ge = true;

        for actor in self.clocks.keys().chain(other.clocks.keys()) {
            let mine = self.get(actor);
            let theirs = other.get(actor);
            if mine < theirs {
                self_ge = false;
            }
            if theirs < mine {
                other_ge = false;
            }
        }

        match (self_ge, other_ge) {
            (true, true) => CausalOrder::Equal,
            (true, false) => CausalOrder::After,
            (false, true) => CausalOrder::Before,
            (false, false) => CausalOrder::Concurrent,
        }
    }

    /// `true` if every counter in `self` is at least the one in `other`.
    pub fn dominates(&self, other: &Self) -> bool {
        matches!(self.compare(other), CausalOrder::After | CausalOrder::Equal)
    }

    pub fn is_concurrent(&self, other: &Self) -> bool {
        self.compare(other) == CausalOrder::Concurrent
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for VersionMap {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            clocks: iter
                .into_iter()
                .map(|(actor, time)| (actor.into(), time))
                .filter(|(_, time)| *time > 0)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn increment_ticks_single_actor() {
        let mut v = VersionMap::new();
        assert_eq!(v.increment("a"), 1);
        assert_eq!(v.increment("a"), 2);
        assert_eq!(v.get("a"), 2);
        assert_eq!(v.get("b"), 0);
    }

    #[test]
    fn compare_detects_order() {
        let a: VersionMap = [("a", 1)].into_iter().collect();
        let ab: VersionMap = [("a", 1), ("b", 1)].into_iter().collect();
        let b: VersionMap = [("b", 1)].into_iter().collect();

        assert_eq!(a.compare(&ab), CausalOrder::Before);
        assert_eq!(ab.compare(&a), CausalOrder::After);
        assert_eq!(a.compare(&b), CausalOrder::Concurrent);
        assert_eq!(a.compare(&a.clone()), CausalOrder::Equal);
        assert!(ab.dominates(&a));
        assert!(!a.dominates(&b));
    }

    #[test]
    fn empty_map_is_before_everything() {
        let empty = VersionMap::new();
        let a: VersionMap = [("a", 3)].into_iter().collect();
        assert_eq!(empty.compare(&a), CausalOrder::Before);
        assert!(a.dominates(&empty));
    }

    #[test]
    fn zero_entries_are_dropped_on_collect() {
        let v: VersionMap = [("a", 0), ("b", 2)].into_iter().collect();
        assert_eq!(v.len(), 1);
        assert_eq!(v.total(), 2);
    }

    fn version_strategy() -> impl Strategy<Value = VersionMap> {
        prop::collection::btree_map("[a-d]", 1u64..5, 0..4)
            .prop_map(|m| m.into_iter().collect())
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in version_strategy(), b in version_strategy()) {
            prop_assert_eq!(a.merged(&b), b.merged(&a));
        }

        #[test]
        fn merge_dominates_both_inputs(a in version_strategy(), b in version_strategy()) {
            let m = a.merged(&b);
            prop_assert!(m.dominates(&a));
            prop_assert!(m.dominates(&b));
        }

        #[test]
        fn merge_is_idempotent(a in version_strategy()) {
            prop_assert_eq!(a.merged(&a), a);
        }
    }
}
