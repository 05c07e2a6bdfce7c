//! Error types for handle operations.

use arcs_keys::KeyError;
use arcs_schema::SchemaError;
use arcs_store::StoreError;
use arcs_types::TypeError;
use thiserror::Error;

/// Errors that can occur while building or using handles.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandleError {
    /// The schema's hash is not in the manager's registry.
    #[error("schema {hash} is not registered")]
    UnregisteredSchema { hash: String },

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("reference error: {0}")]
    Type(#[from] TypeError),
}

/// Convenience type alias for handle operations.
pub type HandleResult<T> = std::result::Result<T, HandleError>;
