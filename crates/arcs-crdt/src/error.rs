//! Error types for CRDT model operations.

use thiserror::Error;

/// Errors that can occur while moving a model across the driver boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrdtError {
    #[error("failed to encode model: {0}")]
    Encode(String),

    #[error("failed to decode model: {0}")]
    Decode(String),
}

/// Convenience type alias for CRDT operations.
pub type CrdtResult<T> = std::result::Result<T, CrdtError>;
