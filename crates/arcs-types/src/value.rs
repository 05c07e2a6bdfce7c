use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::reference::Reference;

/// A single value held by an entity field.
///
/// Numbers are `f64` and are ordered and hashed by their IEEE bit pattern
/// (`total_cmp`), so `FieldValue` can live in ordered sets.
#[derive(Clone, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Reference(Reference),
}

impl FieldValue {
    /// Short tag for the value's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Reference(_) => "reference",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            FieldValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn as_reference_mut(&mut self) -> Option<&mut Reference> {
        match self {
            FieldValue::Reference(r) => Some(r),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Text(_) => 0,
            FieldValue::Number(_) => 1,
            FieldValue::Boolean(_) => 2,
            FieldValue::Reference(_) => 3,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            (FieldValue::Reference(a), FieldValue::Reference(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for FieldValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            FieldValue::Text(s) => s.hash(state),
            FieldValue::Number(n) => n.to_bits().hash(state),
            FieldValue::Boolean(b) => b.hash(state),
            FieldValue::Reference(r) => r.hash(state),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s:?}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Reference(r) => write!(f, "{r:?}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Reference> for FieldValue {
    fn from(value: Reference) -> Self {
        FieldValue::Reference(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(FieldValue::from(21), FieldValue::Number(21.0));
        assert!(FieldValue::from(1.5) < FieldValue::from(2.0));
    }

    #[test]
    fn nan_is_equal_to_itself() {
        let nan = FieldValue::Number(f64::NAN);
        assert_eq!(nan, nan.clone());
    }

    #[test]
    fn kinds_never_compare_equal() {
        assert_ne!(FieldValue::from("true"), FieldValue::from(true));
        assert_ne!(FieldValue::from("1"), FieldValue::from(1));
    }

    #[test]
    fn values_dedupe_in_sets() {
        let set: BTreeSet<FieldValue> = ["a", "b", "a"].into_iter().map(FieldValue::from).collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn accessors_match_variant() {
        let r = Reference::new("e1", "ramdisk://shared/entities");
        assert_eq!(FieldValue::from("x").as_text(), Some("x"));
        assert_eq!(FieldValue::from(3).as_number(), Some(3.0));
        assert_eq!(FieldValue::from(false).as_boolean(), Some(false));
        assert_eq!(FieldValue::from(r.clone()).as_reference(), Some(&r));
        assert!(FieldValue::from("x").as_reference().is_none());
        assert_eq!(FieldValue::from(r).kind(), "reference");
    }
}
