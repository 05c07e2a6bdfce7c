//! Error types for driver operations.

use std::sync::PoisonError;

use thiserror::Error;

/// Errors that can occur while resolving or using a driver.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// No provider is registered for the key's protocol.
    #[error("no driver provider for protocol {protocol:?} (key {key})")]
    NoProvider { protocol: String, key: String },

    /// A provider was asked for a key it does not serve.
    #[error("provider for {protocol:?} cannot serve key {key}")]
    UnsupportedKey { protocol: String, key: String },

    /// A lock guarding backend state was poisoned.
    #[error("driver state poisoned: {0}")]
    Poisoned(String),
}

impl<T> From<PoisonError<T>> for DriverError {
    fn from(e: PoisonError<T>) -> Self {
        DriverError::Poisoned(e.to_string())
    }
}

/// Convenience type alias for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;
