//! Error types for storage key operations.

use std::sync::PoisonError;

use thiserror::Error;

/// Errors that can occur while building or parsing storage keys.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The key string does not follow `protocol://arcId/path`.
    #[error("invalid storage key {key:?}: {reason}")]
    InvalidKeyFormat { key: String, reason: String },

    /// No constructor is registered for the key's protocol.
    #[error("no parser registered for protocol {protocol:?}")]
    UnknownProtocol { protocol: String },

    /// A protocol name or path component is not allowed.
    #[error("invalid key component {component:?}: {reason}")]
    InvalidComponent { component: String, reason: String },

    /// A lock around a parser table was poisoned.
    #[error("parser lock poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<PoisonError<T>> for KeyError {
    fn from(e: PoisonError<T>) -> Self {
        KeyError::Poisoned(e.to_string())
    }
}

/// Convenience type alias for key operations.
pub type KeyResult<T> = std::result::Result<T, KeyError>;
