//! Foundation data types for arcs storage.
//!
//! Every other arcs crate depends on `arcs-types`. It holds the values that
//! flow through stores and handles, and nothing that knows how they are
//! stored.
//!
//! # Key Types
//!
//! - [`ArcId`] -- Identifier of the arc that owns a storage key
//! - [`RawEntity`] -- Untyped entity body: id plus singleton and collection fields
//! - [`FieldValue`] -- A single field value (text, number, boolean, reference)
//! - [`Reference`] -- Weak pointer to an entity in a backing store
//! - [`Dereferencer`] -- Seam through which a [`Reference`] reaches live storage
//! - [`VersionMap`] -- Per-actor vector clock used by the CRDT models

pub mod arc_id;
pub mod entity;
pub mod error;
pub mod reference;
pub mod value;
pub mod version;

pub use arc_id::ArcId;
pub use entity::RawEntity;
pub use error::{TypeError, TypeResult};
pub use reference::{Dereferencer, Reference};
pub use value::FieldValue;
pub use version::{CausalOrder, VersionMap};

/// Name of a field in a schema or entity.
pub type FieldName = String;
