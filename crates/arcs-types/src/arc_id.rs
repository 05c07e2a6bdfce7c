use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an arc: the unit that owns a family of storage keys.
///
/// Arc ids are opaque strings. Production ids are time-ordered UUIDs;
/// tests use readable names.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArcId(String);

impl ArcId {
    /// Create a fresh, time-ordered arc id.
    pub fn new() -> Self {
        Self(format!("arc-{}", Uuid::now_v7().simple()))
    }

    /// Create an arc id with a readable name for tests and demos.
    pub fn new_for_test(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArcId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ArcId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ArcId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArcId({})", self.0)
    }
}

impl fmt::Display for ArcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(ArcId::new(), ArcId::new());
    }

    #[test]
    fn test_ids_compare_by_name() {
        assert_eq!(ArcId::new_for_test("arc"), ArcId::from("arc"));
        assert_eq!(ArcId::new_for_test("arc").to_string(), "arc");
    }

    #[test]
    fn fresh_ids_are_prefixed() {
        assert!(ArcId::new().as_str().starts_with("arc-"));
    }
}
