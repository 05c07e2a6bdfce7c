//! Values tagged with the clock they were written at.
//!
//! A slot (a singleton, or one id in a set) holds an antichain of
//! [`Versioned`] values: every write that no other write in the slot has
//! causally observed. A new local write observes everything, so it
//! replaces the whole antichain. Merging two replicas unions their
//! antichains and drops whatever is dominated. Readers see the
//! [`winner`], picked by clock sum then actor name.

use std::cmp::Ordering;

use arcs_types::{CausalOrder, VersionMap};
use serde::{Deserialize, Serialize};

/// A value plus the clock of the write that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub value: T,
    pub version: VersionMap,
    /// Actor that performed the write.
    pub actor: String,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: VersionMap, actor: impl Into<String>) -> Self {
        Self {
            value,
            version,
            actor: actor.into(),
        }
    }

    /// Deterministic order among concurrent writes.
    fn precedence(&self, other: &Self) -> Ordering {
        self.version
            .total()
            .cmp(&other.version.total())
            .then_with(|| self.actor.cmp(&other.actor))
            .then_with(|| self.version.cmp(&other.version))
    }
}

/// Union `incoming` into `slot`, keeping only undominated writes.
pub(crate) fn join<T: Clone>(slot: &mut Vec<Versioned<T>>, incoming: &[Versioned<T>]) {
    for candidate in incoming {
        let observed = slot.iter().any(|existing| {
            matches!(
                existing.version.compare(&candidate.version),
                CausalOrder::After | CausalOrder::Equal
            )
        });
        if observed {
            continue;
        }
        slot.retain(|existing| existing.version.compare(&candidate.version) != CausalOrder::Before);
        slot.push(candidate.clone());
    }
    slot.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.actor.cmp(&b.actor)));
}

/// Drop every write that `tombstone` has observed.
pub(crate) fn discard_observed<T>(slot: &mut Vec<Versioned<T>>, tombstone: &VersionMap) {
    slot.retain(|entry| !tombstone.dominates(&entry.version));
}

/// The write readers see.
pub(crate) fn winner<T>(slot: &[Versioned<T>]) -> Option<&Versioned<T>> {
    slot.iter().max_by(|a, b| a.precedence(b))
}
