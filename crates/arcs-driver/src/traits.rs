use std::fmt;
use std::sync::Arc;

use arcs_keys::StorageKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DriverResult;

/// Opaque payload persisted by a driver.
///
/// `version` counts accepted writes for the key; `data` is whatever the
/// store encoded. Drivers never look inside `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverModel {
    pub version: u64,
    pub data: Vec<u8>,
}

impl DriverModel {
    pub fn new(version: u64, data: Vec<u8>) -> Self {
        Self { version, data }
    }
}

/// Callback invoked with every accepted model and the name of its sender.
pub type DriverReceiver = Arc<dyn Fn(&DriverModel, Option<&str>) + Send + Sync>;

/// Handle for unregistering a [`DriverReceiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(pub u64);

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver-{}", self.0)
    }
}

/// Persistence and change notification for one storage key.
///
/// Invariants:
/// - `send` accepts a model iff `model.version == current + 1`, where a key
///   that was never written has version 0.
/// - Every accepted model is delivered to every registered receiver,
///   including the sender's own, after the driver's internal locks are
///   released.
/// - Rejected models are not delivered.
#[async_trait]
pub trait Driver: Send + Sync {
    fn storage_key(&self) -> &StorageKey;

    /// The current model, or `None` if the key was never written.
    async fn fetch(&self) -> DriverResult<Option<DriverModel>>;

    /// Offer a successor model. Returns `false` if it was rejected.
    async fn send(&self, model: DriverModel, origin: Option<&str>) -> DriverResult<bool>;

    fn register_receiver(&self, receiver: DriverReceiver) -> DriverResult<ReceiverId>;

    /// Returns `true` if the receiver was registered.
    fn unregister_receiver(&self, id: ReceiverId) -> DriverResult<bool>;
}

/// Source of drivers for one protocol.
pub trait DriverProvider: Send + Sync {
    fn protocol(&self) -> &str;

    fn will_support(&self, key: &StorageKey) -> bool {
        key.protocol() == self.protocol()
    }

    /// The driver for `key`. Repeated calls for equal keys return drivers
    /// that share state.
    fn driver(&self, key: &StorageKey) -> DriverResult<Arc<dyn Driver>>;

    /// Drop every stored model and receiver.
    fn clear(&self) -> DriverResult<()>;
}
