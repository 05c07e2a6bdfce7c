//! Error types for store operations.

use arcs_crdt::CrdtError;
use arcs_driver::DriverError;
use arcs_keys::KeyError;
use thiserror::Error;

/// Errors that can occur while opening or using a store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("model error: {0}")]
    Crdt(#[from] CrdtError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// The key is already open in this registry with a different model.
    #[error("store {key} is already open with a different type")]
    TypeMismatch { key: String },

    /// Every attempt to send a successor model was rejected.
    #[error("store {key}: driver rejected {attempts} consecutive sends")]
    SendRejected { key: String, attempts: usize },

    #[error("store {key} is closed")]
    Closed { key: String },

    /// The owning registry was torn down.
    #[error("stores registry has been torn down")]
    TornDown,

    #[error("store state poisoned: {0}")]
    Poisoned(String),

    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// Convenience type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
