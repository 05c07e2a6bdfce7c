//! Stores for arcs entities.
//!
//! A [`Store`] keeps a local replica of one key's CRDT model and talks to
//! the key's driver: writes are sent as whole successor models, and every
//! model the driver accepts (from any writer) is merged back into each
//! replica, which then tells its update listeners.
//!
//! [`Stores`] is the registry that ties stores to one backend. Stores
//! opened through the same registry share drivers and therefore data;
//! different registries are isolated from each other.
//!
//! # Key Types
//!
//! - [`SingletonStore`] / [`CollectionStore`] -- stores over the two models
//! - [`ReferenceModeSingleton`] / [`ReferenceModeCollection`] -- bodies in a
//!   backing collection, pointers in their own store
//! - [`StoresDereferencer`] -- resolves references against a registry
//! - [`StoreConfig`] -- retry and notification tuning

pub mod config;
pub mod dereferencer;
pub mod error;
pub mod reference_mode;
pub mod registry;
pub mod store;

pub use config::StoreConfig;
pub use dereferencer::StoresDereferencer;
pub use error::{StoreError, StoreResult};
pub use reference_mode::{ReferenceModeCollection, ReferenceModeSingleton};
pub use registry::Stores;
pub use store::{
    CollectionStore, ListenerId, SingletonStore, Store, StoreUpdate, UpdateListener,
};
