use std::fmt;

use arcs_types::{RawEntity, Reference};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CrdtError, CrdtResult};

/// A value that can live in a CRDT model.
///
/// Set members are keyed by [`item_id`](Self::item_id); two items with the
/// same id are two versions of the same member.
pub trait CrdtItem:
    Clone + PartialEq + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn item_id(&self) -> &str;
}

impl CrdtItem for RawEntity {
    fn item_id(&self) -> &str {
        &self.id
    }
}

impl CrdtItem for Reference {
    fn item_id(&self) -> &str {
        &self.id
    }
}

/// State-based CRDT as seen by a store.
///
/// Implementations must satisfy:
/// - `merge` is commutative, associative and idempotent on the value
///   returned by `view`.
/// - `apply` and `merge` return `true` iff the model changed.
/// - `decode(encode(m)) == m`.
pub trait CrdtModel:
    Clone + Default + PartialEq + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// A local mutation.
    type Op: Clone + fmt::Debug + Send + Sync;

    /// What readers see.
    type View: Clone + Send + Sync + 'static;

    /// Apply a local operation.
    fn apply(&mut self, op: &Self::Op) -> bool;

    /// Fold another replica's state into this one.
    fn merge(&mut self, other: &Self) -> bool;

    /// Materialize the reader-facing value.
    fn view(&self) -> Self::View;

    /// A copy of `self` with `other` merged in.
    fn merged(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Serialize for the driver payload.
    fn encode(&self) -> CrdtResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CrdtError::Encode(e.to_string()))
    }

    /// Inverse of [`encode`](Self::encode).
    fn decode(bytes: &[u8]) -> CrdtResult<Self> {
        bincode::deserialize(bytes).map_err(|e| CrdtError::Decode(e.to_string()))
    }
}
