//! Schemas for arcs entities.
//!
//! A [`Schema`] describes the fields an entity may carry and is identified
//! by its [`SchemaHash`]. The [`SchemaRegistry`] maps hashes to schemas and
//! their [`EntitySpec`]s; handle construction looks schemas up there, and
//! policy tooling walks schemas with [`Schema::visit_fields`] to reach
//! every field, including fields of referenced entities.

pub mod error;
pub mod registry;
pub mod schema;
pub mod selector;

pub use error::{SchemaError, SchemaResult};
pub use registry::{EntitySpec, RawEntitySpec, SchemaRegistry};
pub use schema::{FieldType, Schema, SchemaFields, SchemaHash, SchemaName};
pub use selector::{Selector, TUPLE_INDEX_NAMES};
