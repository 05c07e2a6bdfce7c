//! The per-backend registry of open stores.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use arcs_crdt::{CrdtItem, CrdtModel, CrdtSet, CrdtSingleton};
use arcs_driver::DriverFactory;
use arcs_keys::{KeyConstructor, ReferenceModeStorageKey, StorageKey, StorageKeyParser};
use arcs_types::{RawEntity, Reference};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::reference_mode::{ReferenceModeCollection, ReferenceModeSingleton};
use crate::store::{ActiveStore, CollectionStore, SingletonStore, Store};

struct StoresInner {
    config: StoreConfig,
    drivers: DriverFactory,
    parser: RwLock<StorageKeyParser>,
    active: Mutex<HashMap<String, Arc<dyn ActiveStore>>>,
    torn_down: AtomicBool,
}

/// One storage backend and the stores opened against it.
///
/// Cloning is cheap and yields the same registry. Within a registry each
/// key has at most one open store, shared by everyone who asks for it, so
/// all handles on a key see the same replica. Separate registries have
/// separate drivers and separate memory: a key written in one is never
/// visible in another.
#[derive(Clone)]
pub struct Stores {
    inner: Arc<StoresInner>,
}

impl Stores {
    /// A registry with volatile and ramdisk backends and default tuning.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self::with_drivers(config, DriverFactory::with_volatile_defaults())
    }

    /// A registry over a caller-assembled driver factory.
    pub fn with_drivers(config: StoreConfig, drivers: DriverFactory) -> Self {
        Self {
            inner: Arc::new(StoresInner {
                config,
                drivers,
                parser: RwLock::new(StorageKeyParser::with_defaults()),
                active: Mutex::new(HashMap::new()),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn drivers(&self) -> &DriverFactory {
        &self.inner.drivers
    }

    /// `true` if both values are the same registry.
    pub fn same_registry(&self, other: &Stores) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Parse a key string with this registry's parser.
    pub fn parse_key(&self, raw: &str) -> StoreResult<StorageKey> {
        let parser = self
            .inner
            .parser
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(parser.parse(raw)?)
    }

    /// Teach this registry's parser a new protocol.
    pub fn register_key_protocol(
        &self,
        protocol: &str,
        constructor: KeyConstructor,
    ) -> StoreResult<()> {
        self.inner
            .parser
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?
            .register(protocol, constructor)?;
        Ok(())
    }

    /// The singleton store for `key`, opening it on first use.
    pub async fn singleton<T: CrdtItem>(
        &self,
        key: &StorageKey,
    ) -> StoreResult<Arc<SingletonStore<T>>> {
        self.open::<CrdtSingleton<T>>(key).await
    }

    /// The collection store for `key`, opening it on first use.
    pub async fn collection<T: CrdtItem>(
        &self,
        key: &StorageKey,
    ) -> StoreResult<Arc<CollectionStore<T>>> {
        self.open::<CrdtSet<T>>(key).await
    }

    pub async fn reference_mode_singleton(
        &self,
        key: &ReferenceModeStorageKey,
    ) -> StoreResult<ReferenceModeSingleton> {
        let backing = self.collection::<RawEntity>(&key.backing_key).await?;
        let pointers = self.singleton::<Reference>(&key.storage_key).await?;
        Ok(ReferenceModeSingleton::new(key.clone(), backing, pointers))
    }

    pub async fn reference_mode_collection(
        &self,
        key: &ReferenceModeStorageKey,
    ) -> StoreResult<ReferenceModeCollection> {
        let backing = self.collection::<RawEntity>(&key.backing_key).await?;
        let pointers = self.collection::<Reference>(&key.storage_key).await?;
        Ok(ReferenceModeCollection::new(key.clone(), backing, pointers))
    }

    async fn open<M: CrdtModel>(&self, key: &StorageKey) -> StoreResult<Arc<Store<M>>> {
        self.ensure_live()?;
        let key_string = key.to_string();
        let mut active = self.inner.active.lock().await;
        if let Some(existing) = active.get(&key_string) {
            return Arc::clone(existing)
                .into_any()
                .downcast::<Store<M>>()
                .map_err(|_| StoreError::TypeMismatch { key: key_string });
        }

        let driver = self.inner.drivers.driver_for(key)?;
        let store = Store::<M>::open(key.clone(), driver, self.inner.config.clone()).await?;
        active.insert(key_string, Arc::clone(&store) as Arc<dyn ActiveStore>);
        debug!(key = %key, open = active.len(), "store registered");
        Ok(store)
    }

    /// Number of stores currently open.
    pub async fn active_count(&self) -> usize {
        self.inner.active.lock().await.len()
    }

    /// Keys of the stores currently open, sorted.
    pub async fn active_keys(&self) -> Vec<StorageKey> {
        let active = self.inner.active.lock().await;
        let mut keys: Vec<StorageKey> = active.values().map(|s| s.storage_key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    /// Close every open store, wipe the backend memory and deregister its
    /// drivers. Stores, handles and references built on this registry stop
    /// working; later opens fail with [`StoreError::TornDown`].
    pub async fn teardown(&self) -> StoreResult<()> {
        if self.inner.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let closed: Vec<Arc<dyn ActiveStore>> = {
            let mut active = self.inner.active.lock().await;
            active.drain().map(|(_, store)| store).collect()
        };
        for store in &closed {
            store.close();
        }
        self.inner.drivers.clear_all()?;
        self.inner.drivers.clear_registrations()?;
        info!(stores = closed.len(), "stores registry torn down");
        Ok(())
    }

    fn ensure_live(&self) -> StoreResult<()> {
        if self.is_torn_down() {
            return Err(StoreError::TornDown);
        }
        Ok(())
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores")
            .field("config", &self.inner.config)
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}
