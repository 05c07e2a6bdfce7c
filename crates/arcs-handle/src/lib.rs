//! Handles: the client-facing view of arcs storage.
//!
//! A [`HandleManager`] belongs to one participant (an arc on a host) and
//! builds handles bound to a storage key and a registered schema. Handles
//! built by managers that share a [`Stores`](arcs_store::Stores) registry
//! see each other's writes; managers over different registries do not.
//!
//! # Handle kinds
//!
//! - [`SingletonHandle`] / [`CollectionHandle`] -- full entity bodies,
//!   stored in reference mode behind the scenes
//! - [`ReferenceSingletonHandle`] / [`ReferenceCollectionHandle`] --
//!   [`Reference`](arcs_types::Reference) values, manipulated directly
//!
//! Every reference a handle returns, at the top level or inside an entity
//! field, carries the manager's dereferencer and resolves against the
//! manager's registry.

pub mod entity;
pub mod error;
mod handle;
pub mod manager;
pub mod reference;

pub use entity::{CollectionHandle, SingletonHandle};
pub use error::{HandleError, HandleResult};
pub use manager::HandleManager;
pub use reference::{ReferenceCollectionHandle, ReferenceSingletonHandle};
