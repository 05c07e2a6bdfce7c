//! In-memory driver backend.
//!
//! [`VolatileMemory`] holds every model written through its drivers in a
//! `HashMap` behind a `RwLock`, together with the receivers listening on
//! each key. Data lives as long as the memory does; a provider owns one
//! memory, so two providers never see each other's keys.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use arcs_keys::StorageKey;
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::{DriverError, DriverResult};
use crate::traits::{Driver, DriverModel, DriverProvider, DriverReceiver, ReceiverId};

#[derive(Default)]
struct MemoryState {
    entries: HashMap<String, DriverModel>,
    receivers: HashMap<String, Vec<(ReceiverId, DriverReceiver)>>,
    next_receiver: u64,
}

/// Shared backing memory for volatile drivers.
#[derive(Default)]
pub struct VolatileMemory {
    state: RwLock<MemoryState>,
}

impl VolatileMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> DriverResult<Option<DriverModel>> {
        let state = self.state.read()?;
        Ok(state.entries.get(key).cloned())
    }

    pub fn contains(&self, key: &str) -> DriverResult<bool> {
        Ok(self.state.read()?.entries.contains_key(key))
    }

    /// Number of keys holding a model.
    pub fn len(&self) -> DriverResult<usize> {
        Ok(self.state.read()?.entries.len())
    }

    pub fn is_empty(&self) -> DriverResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Store `model` if it succeeds the current version.
    ///
    /// On success returns the receivers to notify; the caller invokes them
    /// after this returns, with no lock held.
    fn compare_and_put(
        &self,
        key: &str,
        model: &DriverModel,
    ) -> DriverResult<Option<Vec<DriverReceiver>>> {
        let mut state = self.state.write()?;
        let current = state.entries.get(key).map_or(0, |m| m.version);
        if model.version != current + 1 {
            return Ok(None);
        }
        state.entries.insert(key.to_string(), model.clone());
        let receivers = state
            .receivers
            .get(key)
            .map(|list| list.iter().map(|(_, r)| Arc::clone(r)).collect())
            .unwrap_or_default();
        Ok(Some(receivers))
    }

    fn add_receiver(&self, key: &str, receiver: DriverReceiver) -> DriverResult<ReceiverId> {
        let mut state = self.state.write()?;
        state.next_receiver += 1;
        let id = ReceiverId(state.next_receiver);
        state
            .receivers
            .entry(key.to_string())
            .or_default()
            .push((id, receiver));
        Ok(id)
    }

    fn remove_receiver(&self, key: &str, id: ReceiverId) -> DriverResult<bool> {
        let mut state = self.state.write()?;
        let Some(list) = state.receivers.get_mut(key) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|(rid, _)| *rid != id);
        let removed = list.len() != before;
        if list.is_empty() {
            state.receivers.remove(key);
        }
        Ok(removed)
    }

    /// Forget every model and receiver.
    pub fn clear(&self) -> DriverResult<()> {
        let mut state = self.state.write()?;
        state.entries.clear();
        state.receivers.clear();
        Ok(())
    }
}

/// Driver for one key over a [`VolatileMemory`].
pub struct VolatileDriver {
    key: StorageKey,
    key_string: String,
    memory: Arc<VolatileMemory>,
}

impl VolatileDriver {
    pub fn new(key: StorageKey, memory: Arc<VolatileMemory>) -> Self {
        Self {
            key_string: key.to_string(),
            key,
            memory,
        }
    }
}

#[async_trait]
impl Driver for VolatileDriver {
    fn storage_key(&self) -> &StorageKey {
        &self.key
    }

    async fn fetch(&self) -> DriverResult<Option<DriverModel>> {
        self.memory.get(&self.key_string)
    }

    async fn send(&self, model: DriverModel, origin: Option<&str>) -> DriverResult<bool> {
        let Some(receivers) = self.memory.compare_and_put(&self.key_string, &model)? else {
            debug!(key = %self.key, version = model.version, "send rejected");
            return Ok(false);
        };
        debug!(
            key = %self.key,
            version = model.version,
            receivers = receivers.len(),
            "send accepted"
        );
        for receiver in receivers {
            receiver(&model, origin);
        }
        Ok(true)
    }

    fn register_receiver(&self, receiver: DriverReceiver) -> DriverResult<ReceiverId> {
        let id = self.memory.add_receiver(&self.key_string, receiver)?;
        trace!(key = %self.key, %id, "receiver registered");
        Ok(id)
    }

    fn unregister_receiver(&self, id: ReceiverId) -> DriverResult<bool> {
        self.memory.remove_receiver(&self.key_string, id)
    }
}

/// Provider of [`VolatileDriver`]s for one protocol, over one memory.
pub struct VolatileDriverProvider {
    protocol: String,
    memory: Arc<VolatileMemory>,
    drivers: RwLock<HashMap<String, Arc<VolatileDriver>>>,
}

impl VolatileDriverProvider {
    /// A provider with fresh memory.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self::with_memory(protocol, Arc::new(VolatileMemory::new()))
    }

    pub fn with_memory(protocol: impl Into<String>, memory: Arc<VolatileMemory>) -> Self {
        Self {
            protocol: protocol.into(),
            memory,
            drivers: RwLock::new(HashMap::new()),
        }
    }

    pub fn memory(&self) -> &Arc<VolatileMemory> {
        &self.memory
    }
}

impl DriverProvider for VolatileDriverProvider {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn driver(&self, key: &StorageKey) -> DriverResult<Arc<dyn Driver>> {
        if !self.will_support(key) {
            return Err(DriverError::UnsupportedKey {
                protocol: self.protocol.clone(),
                key: key.to_string(),
            });
        }
        let key_string = key.to_string();
        if let Some(existing) = self.drivers.read()?.get(&key_string) {
            return Ok(Arc::clone(existing) as Arc<dyn Driver>);
        }
        let mut drivers = self.drivers.write()?;
        let driver = drivers
            .entry(key_string)
            .or_insert_with(|| Arc::new(VolatileDriver::new(key.clone(), Arc::clone(&self.memory))));
        Ok(Arc::clone(driver) as Arc<dyn Driver>)
    }

    fn clear(&self) -> DriverResult<()> {
        self.memory.clear()?;
        self.drivers.write()?.clear();
        debug!(protocol = %self.protocol, "volatile provider cleared");
        Ok(())
    }
}
