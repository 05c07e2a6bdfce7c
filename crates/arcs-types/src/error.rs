use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("reference {id} has no dereferencer attached")]
    NoDereferencer { id: String },

    #[error("failed to dereference {id}: {reason}")]
    Dereference { id: String, reason: String },

    #[error("malformed entity json: {0}")]
    MalformedJson(String),

    #[error("field {field} holds {value}, which json cannot represent")]
    NonFiniteNumber { field: String, value: String },
}

/// Result alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
