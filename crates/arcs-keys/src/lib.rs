//! Storage keys for arcs storage.
//!
//! A storage key is the address of one store:
//! `<protocol>://<arcId>/<path segment>[/<path segment>...]`. The protocol
//! selects which driver backend holds the data; the rest is opaque to the
//! backend apart from being a stable map key.
//!
//! # Modules
//!
//! - [`error`] -- Error types for key operations
//! - [`key`] -- [`StorageKey`] and the composite [`ReferenceModeStorageKey`]
//! - [`names`] -- Path component validation
//! - [`parser`] -- [`StorageKeyParser`], the protocol -> constructor table

pub mod error;
pub mod key;
pub mod names;
pub mod parser;

pub use error::{KeyError, KeyResult};
pub use key::{
    ReferenceModeStorageKey, StorageKey, RAMDISK_ARC_ID, RAMDISK_PROTOCOL, VOLATILE_PROTOCOL,
};
pub use names::{validate_component, validate_protocol};
pub use parser::{KeyConstructor, StorageKeyParser};
