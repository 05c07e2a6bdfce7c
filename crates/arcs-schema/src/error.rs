//! Error types for schema operations.

use std::sync::PoisonError;

use thiserror::Error;

/// Errors that can occur while building, checking or walking schemas.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The entity has a field its schema does not declare.
    #[error("field {field:?} is not declared by schema {schema}")]
    UnknownField { schema: String, field: String },

    /// A field value does not match the declared type.
    #[error("field {field:?} expects {expected}, got {found}")]
    FieldTypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("tuple component {index} out of range (at most {max} components)")]
    TupleIndexOutOfRange { index: usize, max: usize },

    #[error("schema serialization error: {0}")]
    Serialization(String),

    /// The registry lock was poisoned by a panicking writer.
    #[error("schema registry poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<PoisonError<T>> for SchemaError {
    fn from(e: PoisonError<T>) -> Self {
        SchemaError::Poisoned(e.to_string())
    }
}

/// Convenience type alias for schema operations.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
