//! Single-value register.

use arcs_types::VersionMap;
use serde::{Deserialize, Serialize};

use crate::model::{CrdtItem, CrdtModel};
use crate::versioned::{join, winner, Versioned};

/// Local mutation of a [`CrdtSingleton`].
#[derive(Debug, Clone, PartialEq)]
pub enum SingletonOp<T> {
    /// Replace the held value.
    Set { actor: String, value: T },
    /// Replace the held value with nothing.
    Clear { actor: String },
}

/// Register holding at most one value.
///
/// A set replaces the whole value. Writes made without seeing each other
/// are both retained and readers see the one with the larger clock sum
/// (actor name breaks ties), so all replicas agree. A clear is a write of
/// `None` and follows the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrdtSingleton<T> {
    clock: VersionMap,
    values: Vec<Versioned<Option<T>>>,
}

impl<T> Default for CrdtSingleton<T> {
    fn default() -> Self {
        Self {
            clock: VersionMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T: CrdtItem> CrdtSingleton<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything this replica has observed.
    pub fn clock(&self) -> &VersionMap {
        &self.clock
    }

    /// The current value, if any.
    pub fn get(&self) -> Option<&T> {
        winner(&self.values).and_then(|w| w.value.as_ref())
    }

    /// Number of concurrent writes currently retained.
    pub fn concurrent_writes(&self) -> usize {
        self.values.len()
    }

    fn write(&mut self, actor: &str, value: Option<T>) {
        self.clock.increment(actor);
        self.values = vec![Versioned::new(value, self.clock.clone(), actor)];
    }
}

impl<T: CrdtItem> CrdtModel for CrdtSingleton<T> {
    type Op = SingletonOp<T>;
    type View = Option<T>;

    fn apply(&mut self, op: &Self::Op) -> bool {
        match op {
            SingletonOp::Set { actor, value } => {
                self.write(actor, Some(value.clone()));
                true
            }
            SingletonOp::Clear { actor } => {
                if self.get().is_none() {
                    return false;
                }
                self.write(actor, None);
                true
            }
        }
    }

    fn merge(&mut self, other: &Self) -> bool {
        let before = self.clone();
        self.clock.merge(&other.clock);
        join(&mut self.values, &other.values);
        *self != before
    }

    fn view(&self) -> Self::View {
        self.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcs_types::RawEntity;
    use proptest::prelude::*;

    fn person(id: &str, name: &str) -> RawEntity {
        RawEntity::new(id).with_singleton("name", name)
    }

    fn set(actor: &str, value: RawEntity) -> SingletonOp<RawEntity> {
        SingletonOp::Set {
            actor: actor.into(),
            value,
        }
    }

    #[test]
    fn set_then_clear() {
        let mut s = CrdtSingleton::new();
        assert_eq!(s.view(), None);

        assert!(s.apply(&set("a", person("e1", "Jason"))));
        assert_eq!(s.view(), Some(person("e1", "Jason")));

        assert!(s.apply(&SingletonOp::Clear { actor: "a".into() }));
        assert_eq!(s.view(), None);
        assert!(!s.apply(&SingletonOp::Clear { actor: "a".into() }));
    }

    #[test]
    fn later_set_replaces_whole_value() {
        let mut s = CrdtSingleton::new();
        s.apply(&set("a", person("e1", "Jason").with_singleton("age", 21)));
        s.apply(&set("a", person("e1", "Ben")));
        assert_eq!(s.view(), Some(person("e1", "Ben")));
    }

    #[test]
    fn merge_follows_causality() {
        let mut a = CrdtSingleton::new();
        a.apply(&set("a", person("e1", "Jason")));

        let mut b = a.clone();
        b.apply(&set("b", person("e1", "Ben")));

        assert!(a.merge(&b));
        assert_eq!(a.view(), Some(person("e1", "Ben")));
        assert_eq!(a.concurrent_writes(), 1);
        assert!(!a.merge(&b));
    }

    #[test]
    fn concurrent_sets_converge() {
        let mut a = CrdtSingleton::new();
        let mut b = CrdtSingleton::new();
        a.apply(&set("a", person("e1", "Jason")));
        b.apply(&set("b", person("e2", "Ben")));

        let ab = a.merged(&b);
        let ba = b.merged(&a);
        assert_eq!(ab, ba);
        assert_eq!(ab.concurrent_writes(), 2);
        assert_eq!(ab.view(), Some(person("e2", "Ben")));
    }

    #[test]
    fn clear_after_observing_concurrent_sets_clears_both() {
        let mut a = CrdtSingleton::new();
        let mut b = CrdtSingleton::new();
        a.apply(&set("a", person("e1", "Jason")));
        b.apply(&set("b", person("e2", "Ben")));
        a.merge(&b);

        a.apply(&SingletonOp::Clear { actor: "a".into() });
        b.merge(&a);
        assert_eq!(b.view(), None);
        assert_eq!(b.concurrent_writes(), 1);
    }

    #[test]
    fn encode_decode() {
        let mut s = CrdtSingleton::new();
        s.apply(&set("a", person("e1", "Jason")));
        let bytes = s.encode().unwrap();
        assert_eq!(CrdtSingleton::<RawEntity>::decode(&bytes).unwrap(), s);
        assert!(CrdtSingleton::<RawEntity>::decode(&[0xff, 0x01]).is_err());
    }

    fn op_strategy() -> impl Strategy<Value = (usize, Option<String>)> {
        (0usize..3, prop::option::of("[a-c]"))
    }

    fn replay(ops: &[(usize, Option<String>)]) -> Vec<CrdtSingleton<RawEntity>> {
        let actors = ["a", "b", "c"];
        let mut replicas = vec![CrdtSingleton::new(); 3];
        for (i, (replica, value)) in ops.iter().enumerate() {
            let actor = actors[*replica].to_string();
            let op = match value {
                Some(name) => SingletonOp::Set {
                    actor,
                    value: person("e", name),
                },
                None => SingletonOp::Clear { actor },
            };
            replicas[*replica].apply(&op);
            // Occasionally gossip to the next replica.
            if i % 3 == 0 {
                let source = replicas[*replica].clone();
                replicas[(*replica + 1) % 3].merge(&source);
            }
        }
        replicas
    }

    proptest! {
        #[test]
        fn merge_is_commutative(ops in prop::collection::vec(op_strategy(), 0..20)) {
            let r = replay(&ops);
            prop_assert_eq!(r[0].merged(&r[1]), r[1].merged(&r[0]));
        }

        #[test]
        fn merge_is_associative(ops in prop::collection::vec(op_strategy(), 0..20)) {
            let r = replay(&ops);
            let left = r[0].merged(&r[1]).merged(&r[2]);
            let right = r[0].merged(&r[1].merged(&r[2]));
            prop_assert_eq!(left, right);
        }

        #[test]
        fn merge_is_idempotent(ops in prop::collection::vec(op_strategy(), 0..20)) {
            let r = replay(&ops);
            let once = r[0].merged(&r[1]);
            prop_assert_eq!(once.merged(&r[1]), once.clone());
            prop_assert_eq!(once.merged(&once), once);
        }
    }
}
