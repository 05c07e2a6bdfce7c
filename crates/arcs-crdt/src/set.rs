//! Id-keyed set with tombstones.

use std::collections::BTreeMap;

use arcs_types::VersionMap;
use serde::{Deserialize, Serialize};

use crate::model::{CrdtItem, CrdtModel};
use crate::versioned::{discard_observed, join, winner, Versioned};

/// Local mutation of a [`CrdtSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum SetOp<T> {
    /// Add a member, or replace the member with the same id.
    Add { actor: String, value: T },
    /// Remove the member with `id`.
    Remove { actor: String, id: String },
    /// Remove every member.
    Clear { actor: String },
}

/// Set of items keyed by [`CrdtItem::item_id`].
///
/// Removing an id records a tombstone holding the clock at the time of
/// removal. A tombstone hides every write to that id it has observed; a
/// write it has not observed (a concurrent add, or any later add) stays
/// visible. Tombstones are kept so that "removed" stays distinguishable
/// from "not yet seen" when replicas merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrdtSet<T> {
    clock: VersionMap,
    entries: BTreeMap<String, Vec<Versioned<T>>>,
    tombstones: BTreeMap<String, VersionMap>,
}

impl<T> Default for CrdtSet<T> {
    fn default() -> Self {
        Self {
            clock: VersionMap::new(),
            entries: BTreeMap::new(),
            tombstones: BTreeMap::new(),
        }
    }
}

impl<T: CrdtItem> CrdtSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clock(&self) -> &VersionMap {
        &self.clock
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries
            .get(id)
            .and_then(|slot| winner(slot))
            .map(|w| &w.value)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Clock of the visible write for `id`.
    pub fn version_of(&self, id: &str) -> Option<&VersionMap> {
        self.entries
            .get(id)
            .and_then(|slot| winner(slot))
            .map(|w| &w.version)
    }

    /// `true` if `id` has been removed at least once.
    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Visible members in id order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries
            .values()
            .filter_map(|slot| winner(slot))
            .map(|w| &w.value)
    }

    fn tombstone(&mut self, id: &str) {
        let at = self.clock.clone();
        self.tombstones
            .entry(id.to_string())
            .and_modify(|existing| existing.merge(&at))
            .or_insert(at);
        self.entries.remove(id);
    }
}

impl<T: CrdtItem> CrdtModel for CrdtSet<T> {
    type Op = SetOp<T>;
    type View = Vec<T>;

    fn apply(&mut self, op: &Self::Op) -> bool {
        match op {
            SetOp::Add { actor, value } => {
                self.clock.increment(actor);
                let write = Versioned::new(value.clone(), self.clock.clone(), actor.as_str());
                self.entries.insert(value.item_id().to_string(), vec![write]);
                true
            }
            SetOp::Remove { actor, id } => {
                if !self.entries.contains_key(id) {
                    return false;
                }
                self.clock.increment(actor);
                self.tombstone(id);
                true
            }
            SetOp::Clear { actor } => {
                if self.entries.is_empty() {
                    return false;
                }
                self.clock.increment(actor);
                let ids: Vec<String> = self.entries.keys().cloned().collect();
                for id in ids {
                    self.tombstone(&id);
                }
                true
            }
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        let before = self.clone();
        self.clock.merge(&other.clock);

        for (id, at) in &other.tombstones {
            self.tombstones
                .entry(id.clone())
                .and_modify(|existing| existing.merge(at))
                .or_insert_with(|| at.clone());
        }
        for (id, slot) in &other.entries {
            join(self.entries.entry(id.clone()).or_default(), slot);
        }

        let tombstones = &self.tombstones;
        self.entries.retain(|id, slot| {
            if let Some(at) = tombstones.get(id) {
                discard_observed(slot, at);
            }
            !slot.is_empty()
        });

        *self != before
    }

    fn view(&self) -> Self::View {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcs_types::RawEntity;
    use proptest::prelude::*;

    fn entity(id: &str, name: &str) -> RawEntity {
        RawEntity::new(id).with_singleton("name", name)
    }

    fn add(actor: &str, value: RawEntity) -> SetOp<RawEntity> {
        SetOp::Add {
            actor: actor.into(),
            value,
        }
    }

    fn remove(actor: &str, id: &str) -> SetOp<RawEntity> {
        SetOp::Remove {
            actor: actor.into(),
            id: id.into(),
        }
    }

    #[test]
    fn add_twice_yields_one_member() {
        let mut s = CrdtSet::new();
        s.apply(&add("a", entity("e1", "Jason")));
        s.apply(&add("a", entity("e1", "Jason")));
        assert_eq!(s.view(), vec![entity("e1", "Jason")]);
    }

    #[test]
    fn add_two_remove_one() {
        let mut s = CrdtSet::new();
        s.apply(&add("a", entity("e1", "Jason")));
        s.apply(&add("a", entity("e2", "Jason")));
        assert_eq!(s.len(), 2);

        assert!(s.apply(&remove("a", "e1")));
        assert_eq!(s.view(), vec![entity("e2", "Jason")]);
        assert!(s.is_tombstoned("e1"));
        assert!(!s.apply(&remove("a", "e1")));
    }

    #[test]
    fn add_replaces_member_with_same_id() {
        let mut s = CrdtSet::new();
        s.apply(&add("a", entity("e1", "Jason")));
        let first = s.version_of("e1").cloned().unwrap();
        s.apply(&add("a", entity("e1", "Ben")));
        assert_eq!(s.get("e1"), Some(&entity("e1", "Ben")));
        assert!(s.version_of("e1").unwrap().dominates(&first));
    }

    #[test]
    fn clear_removes_everything() {
        let mut s = CrdtSet::new();
        assert!(!s.apply(&SetOp::Clear { actor: "a".into() }));
        s.apply(&add("a", entity("e1", "Jason")));
        s.apply(&add("a", entity("e2", "Ben")));
        assert!(s.apply(&SetOp::Clear { actor: "a".into() }));
        assert!(s.is_empty());
        assert!(s.is_tombstoned("e1") && s.is_tombstoned("e2"));
    }

    #[test]
    fn readd_after_remove_is_visible() {
        let mut s = CrdtSet::new();
        s.apply(&add("a", entity("e1", "Jason")));
        s.apply(&remove("a", "e1"));
        s.apply(&add("a", entity("e1", "Ben")));
        assert_eq!(s.get("e1"), Some(&entity("e1", "Ben")));
    }

    #[test]
    fn observed_remove_beats_older_add() {
        let mut a = CrdtSet::new();
        a.apply(&add("a", entity("e1", "Jason")));
        let mut b = a.clone();
        b.apply(&remove("b", "e1"));

        assert!(a.merge(&b));
        assert!(!a.contains("e1"));
        assert!(!b.merge(&a));
        assert_eq!(a.view(), b.view());
    }

    #[test]
    fn concurrent_add_beats_remove() {
        let mut a = CrdtSet::new();
        a.apply(&add("a", entity("e1", "Jason")));
        let mut b = a.clone();

        b.apply(&remove("b", "e1"));
        a.apply(&add("a", entity("e1", "Ben")));

        let ab = a.merged(&b);
        let ba = b.merged(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.get("e1"), Some(&entity("e1", "Ben")));
    }

    #[test]
    fn unseen_id_is_not_tombstoned() {
        let s: CrdtSet<RawEntity> = CrdtSet::new();
        assert!(!s.contains("ghost"));
        assert!(!s.is_tombstoned("ghost"));
    }

    #[test]
    fn encode_decode() {
        let mut s = CrdtSet::new();
        s.apply(&add("a", entity("e1", "Jason")));
        s.apply(&add("a", entity("e2", "Ben")));
        s.apply(&remove("a", "e2"));
        let decoded = CrdtSet::<RawEntity>::decode(&s.encode().unwrap()).unwrap();
        assert_eq!(decoded, s);
    }

    #[derive(Debug, Clone)]
    enum Action {
        Add(usize, String, String),
        Remove(usize, String),
        Clear(usize),
        Sync(usize, usize),
    }

    fn action_strategy() -> impl Strategy<Value = Action> {
        prop_oneof![
            4 => (0usize..3, "[a-c]", "[xyz]").prop_map(|(r, id, name)| Action::Add(r, id, name)),
            2 => (0usize..3, "[a-c]").prop_map(|(r, id)| Action::Remove(r, id)),
            1 => (0usize..3).prop_map(Action::Clear),
            2 => (0usize..3, 0usize..3).prop_map(|(from, to)| Action::Sync(from, to)),
        ]
    }

    fn replay(actions: &[Action]) -> Vec<CrdtSet<RawEntity>> {
        let actors = ["r0", "r1", "r2"];
        let mut replicas = vec![CrdtSet::new(); 3];
        for action in actions {
            match action {
                Action::Add(r, id, name) => {
                    replicas[*r].apply(&add(actors[*r], entity(id, name)));
                }
                Action::Remove(r, id) => {
                    replicas[*r].apply(&remove(actors[*r], id));
                }
                Action::Clear(r) => {
                    replicas[*r].apply(&SetOp::Clear {
                        actor: actors[*r].into(),
                    });
                }
                Action::Sync(from, to) => {
                    let source = replicas[*from].clone();
                    replicas[*to].merge(&source);
                }
            }
        }
        replicas
    }

    proptest! {
        #[test]
        fn merge_is_commutative(actions in prop::collection::vec(action_strategy(), 0..30)) {
            let r = replay(&actions);
            prop_assert_eq!(r[0].merged(&r[1]), r[1].merged(&r[0]));
        }

        #[test]
        fn merge_is_associative(actions in prop::collection::vec(action_strategy(), 0..30)) {
            let r = replay(&actions);
            let left = r[0].merged(&r[1]).merged(&r[2]);
            let right = r[0].merged(&r[1].merged(&r[2]));
            prop_assert_eq!(left.view(), right.view());
        }

        #[test]
        fn merge_is_idempotent(actions in prop::collection::vec(action_strategy(), 0..30)) {
            let r = replay(&actions);
            let once = r[0].merged(&r[2]);
            prop_assert_eq!(once.merged(&once), once.clone());
            prop_assert_eq!(once.merged(&r[2]), once);
        }

        #[test]
        fn all_replicas_converge(actions in prop::collection::vec(action_strategy(), 0..30)) {
            let r = replay(&actions);
            let mut a = r[0].clone();
            a.merge(&r[1]);
            a.merge(&r[2]);
            let mut b = r[2].clone();
            b.merge(&r[0]);
            b.merge(&r[1]);
            prop_assert_eq!(a.view(), b.view());
        }
    }
}
