//! Convergent data models for arcs stores.
//!
//! A store never holds a plain value: it holds a CRDT model whose merge is
//! commutative, associative and idempotent, so every replica of a key
//! reaches the same state no matter the order in which it sees writes.
//!
//! # Models
//!
//! - [`CrdtSingleton`] -- at most one value, whole-value last-write-wins
//! - [`CrdtSet`] -- values keyed by id, with tombstones for removed ids
//!
//! Both implement [`CrdtModel`], the interface stores are generic over.
//! Concurrent writes are kept side by side as [`Versioned`] values until
//! a causally later write supersedes them; readers see a single winner
//! chosen deterministically.

pub mod error;
pub mod model;
pub mod set;
pub mod singleton;
pub mod versioned;

pub use error::{CrdtError, CrdtResult};
pub use model::{CrdtItem, CrdtModel};
pub use set::{CrdtSet, SetOp};
pub use singleton::{CrdtSingleton, SingletonOp};
pub use versioned::Versioned;
