//! A single key's replica.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arcs_crdt::{CrdtItem, CrdtModel, CrdtSet, CrdtSingleton, SetOp, SingletonOp};
use arcs_driver::{Driver, DriverModel, ReceiverId};
use arcs_keys::StorageKey;
use arcs_types::VersionMap;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};

/// What listeners receive after a merge changed the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreUpdate<V> {
    /// The full materialized value after the merge.
    pub value: V,
    /// Name the writer passed with its write, if any.
    pub origin: Option<String>,
}

impl<V> StoreUpdate<V> {
    /// `true` if the write that caused this update was tagged `name`.
    pub fn is_from(&self, name: &str) -> bool {
        self.origin.as_deref() == Some(name)
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> StoreUpdate<U> {
        StoreUpdate {
            value: f(self.value),
            origin: self.origin,
        }
    }
}

/// Callback registered with [`Store::add_on_update`].
pub type UpdateListener<V> = Arc<dyn Fn(&StoreUpdate<V>) + Send + Sync>;

/// Handle for removing an [`UpdateListener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct LocalState<M> {
    model: M,
    /// Driver version the local model has absorbed.
    version: u64,
}

/// Local replica of the model stored under one key.
///
/// Writes never touch the local model directly: the store applies the
/// operation to a copy, offers the copy to the driver as the successor of
/// the last version it has seen, and picks the result up again through its
/// own driver receiver, exactly like every other replica of the key does.
///
/// Writes through one store are serialized: each waits for the previous
/// one to be accepted before building its candidate. A rejected offer
/// therefore means another replica of the key got there first; the store
/// syncs and tries again, up to [`StoreConfig::max_send_attempts`] times.
pub struct Store<M: CrdtModel> {
    key: StorageKey,
    actor: String,
    driver: Arc<dyn Driver>,
    config: StoreConfig,
    state: RwLock<LocalState<M>>,
    write_gate: Mutex<()>,
    listeners: RwLock<Vec<(ListenerId, UpdateListener<M::View>)>>,
    next_listener: AtomicU64,
    receiver: OnceLock<ReceiverId>,
    closed: AtomicBool,
}

/// Store holding at most one `T`.
pub type SingletonStore<T> = Store<CrdtSingleton<T>>;

/// Store holding a set of `T` keyed by id.
pub type CollectionStore<T> = Store<CrdtSet<T>>;

impl<M: CrdtModel> Store<M> {
    /// Open a replica over `driver` and load the driver's current model.
    pub async fn open(
        key: StorageKey,
        driver: Arc<dyn Driver>,
        config: StoreConfig,
    ) -> StoreResult<Arc<Self>> {
        config.validate()?;
        let store = Arc::new(Self {
            key,
            actor: format!("actor-{}", Uuid::now_v7().simple()),
            driver,
            config,
            state: RwLock::new(LocalState {
                model: M::default(),
                version: 0,
            }),
            write_gate: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            receiver: OnceLock::new(),
            closed: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&store);
        let receiver = store
            .driver
            .register_receiver(Arc::new(move |model: &DriverModel, origin: Option<&str>| {
                if let Some(store) = weak.upgrade() {
                    store.on_driver_model(model, origin);
                }
            }))?;
        let _ = store.receiver.set(receiver);

        store.sync().await?;
        debug!(key = %store.key, actor = %store.actor, "store opened");
        Ok(store)
    }

    pub fn storage_key(&self) -> &StorageKey {
        &self.key
    }

    /// Actor name this replica stamps its writes with.
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Last driver version absorbed.
    pub fn version(&self) -> StoreResult<u64> {
        Ok(self.read_state()?.version)
    }

    /// Copy of the local model.
    pub fn model(&self) -> StoreResult<M> {
        Ok(self.read_state()?.model.clone())
    }

    /// The materialized value of the local model.
    pub fn view(&self) -> StoreResult<M::View> {
        Ok(self.read_state()?.model.view())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Apply `op` and wait until the driver has accepted the result.
    ///
    /// Returns `false` without contacting the driver if `op` changes
    /// nothing.
    pub async fn apply_op(&self, op: M::Op, origin: Option<&str>) -> StoreResult<bool> {
        let _gate = self.write_gate.lock().await;
        for attempt in 1..=self.config.max_send_attempts {
            let (candidate, version) = {
                let state = self.read_state()?;
                let mut candidate = state.model.clone();
                if !candidate.apply(&op) {
                    trace!(key = %self.key, ?op, "operation is a no-op");
                    return Ok(false);
                }
                (candidate, state.version + 1)
            };
            let model = DriverModel::new(version, candidate.encode()?);
            if self.driver.send(model, origin).await? {
                return Ok(true);
            }
            debug!(key = %self.key, attempt, "send rejected, resyncing");
            self.sync().await?;
        }
        warn!(
            key = %self.key,
            attempts = self.config.max_send_attempts,
            "giving up on write"
        );
        Err(StoreError::SendRejected {
            key: self.key.to_string(),
            attempts: self.config.max_send_attempts,
        })
    }

    /// Merge the driver's current model into the local one.
    ///
    /// Listeners are not notified; anything new here was already announced
    /// through the driver receiver or predates them.
    pub async fn sync(&self) -> StoreResult<()> {
        self.ensure_open()?;
        if let Some(model) = self.driver.fetch().await? {
            self.absorb(&model)?;
        }
        Ok(())
    }

    pub fn add_on_update(&self, listener: UpdateListener<M::View>) -> StoreResult<ListenerId> {
        self.ensure_open()?;
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?
            .push((id, listener));
        Ok(id)
    }

    /// Returns `true` if the listener was registered.
    pub fn remove_on_update(&self, id: ListenerId) -> StoreResult<bool> {
        let mut listeners = self
            .listeners
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        Ok(listeners.len() != before)
    }

    /// Detach from the driver and drop all listeners. Later calls fail
    /// with [`StoreError::Closed`].
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(id) = self.receiver.get() {
            if let Err(e) = self.driver.unregister_receiver(*id) {
                warn!(key = %self.key, error = %e, "failed to unregister receiver");
            }
        }
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.clear();
        }
        debug!(key = %self.key, "store closed");
    }

    fn on_driver_model(&self, model: &DriverModel, origin: Option<&str>) {
        if self.is_closed() {
            return;
        }
        match self.absorb(model) {
            Ok((true, view)) => self.notify(view, origin),
            Ok((false, view)) if self.config.notify_on_noop => self.notify(view, origin),
            Ok(_) => {}
            Err(e) => warn!(key = %self.key, error = %e, "failed to absorb driver model"),
        }
    }

    /// Merge a driver model; returns whether anything changed and the
    /// resulting view.
    fn absorb(&self, model: &DriverModel) -> StoreResult<(bool, M::View)> {
        let incoming = M::decode(&model.data)?;
        let mut state = self.write_state()?;
        state.version = state.version.max(model.version);
        let changed = state.model.merge(&incoming);
        trace!(key = %self.key, version = model.version, changed, "merged driver model");
        Ok((changed, state.model.view()))
    }

    fn notify(&self, view: M::View, origin: Option<&str>) {
        let listeners: Vec<UpdateListener<M::View>> = match self.listeners.read() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "listener table poisoned");
                return;
            }
        };
        if listeners.is_empty() {
            return;
        }
        let update = StoreUpdate {
            value: view,
            origin: origin.map(str::to_string),
        };
        for listener in listeners {
            listener(&update);
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed {
                key: self.key.to_string(),
            });
        }
        Ok(())
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, LocalState<M>>> {
        self.ensure_open()?;
        self.state
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, LocalState<M>>> {
        self.state
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl<M: CrdtModel> Drop for Store<M> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M: CrdtModel> fmt::Debug for Store<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("key", &self.key.to_string())
            .field("actor", &self.actor)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T: CrdtItem> Store<CrdtSingleton<T>> {
    /// Replace the held value.
    pub async fn set(&self, value: T, origin: Option<&str>) -> StoreResult<bool> {
        let op = SingletonOp::Set {
            actor: self.actor.clone(),
            value,
        };
        self.apply_op(op, origin).await
    }

    /// Remove the held value.
    pub async fn clear(&self, origin: Option<&str>) -> StoreResult<bool> {
        let op = SingletonOp::Clear {
            actor: self.actor.clone(),
        };
        self.apply_op(op, origin).await
    }

    pub fn get(&self) -> StoreResult<Option<T>> {
        Ok(self.read_state()?.model.get().cloned())
    }
}

impl<T: CrdtItem> Store<CrdtSet<T>> {
    /// Add `value`, replacing any member with the same id.
    pub async fn add(&self, value: T, origin: Option<&str>) -> StoreResult<bool> {
        let op = SetOp::Add {
            actor: self.actor.clone(),
            value,
        };
        self.apply_op(op, origin).await
    }

    pub async fn remove(&self, id: &str, origin: Option<&str>) -> StoreResult<bool> {
        let op = SetOp::Remove {
            actor: self.actor.clone(),
            id: id.to_string(),
        };
        self.apply_op(op, origin).await
    }

    pub async fn clear(&self, origin: Option<&str>) -> StoreResult<bool> {
        let op = SetOp::Clear {
            actor: self.actor.clone(),
        };
        self.apply_op(op, origin).await
    }

    /// Every live member, in id order.
    pub fn get_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.read_state()?.model.view())
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        Ok(self.read_state()?.model.get(id).cloned())
    }

    pub fn contains(&self, id: &str) -> StoreResult<bool> {
        Ok(self.read_state()?.model.contains(id))
    }

    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_state()?.model.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Clock of the visible write for `id`.
    pub fn version_of(&self, id: &str) -> StoreResult<Option<VersionMap>> {
        Ok(self.read_state()?.model.version_of(id).cloned())
    }
}

/// Type-erased view of an open store, used by the registry cache.
pub(crate) trait ActiveStore: Send + Sync {
    fn storage_key(&self) -> &StorageKey;

    fn close(&self);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<M: CrdtModel> ActiveStore for Store<M> {
    fn storage_key(&self) -> &StorageKey {
        &self.key
    }

    fn close(&self) {
        Store::close(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
