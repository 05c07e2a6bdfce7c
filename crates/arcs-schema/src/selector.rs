use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use arcs_types::FieldName;

/// Names used for tuple components, in position order.
pub const TUPLE_INDEX_NAMES: [&str; 5] = ["first", "second", "third", "fourth", "fifth"];

/// One step of an access path into an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Selector {
    Field(FieldName),
}

impl Selector {
    pub fn field(name: impl Into<FieldName>) -> Self {
        Selector::Field(name.into())
    }

    /// Selector for the `index`-th component of a tuple.
    pub fn tuple_component(index: usize) -> SchemaResult<Self> {
        TUPLE_INDEX_NAMES
            .get(index)
            .map(|name| Selector::field(*name))
            .ok_or(SchemaError::TupleIndexOutOfRange {
                index,
                max: TUPLE_INDEX_NAMES.len(),
            })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Field(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_components_are_named() {
        assert_eq!(Selector::tuple_component(0).unwrap(), Selector::field("first"));
        assert_eq!(Selector::tuple_component(4).unwrap().to_string(), "fifth");
        assert_eq!(
            Selector::tuple_component(5),
            Err(SchemaError::TupleIndexOutOfRange { index: 5, max: 5 })
        );
    }
}
