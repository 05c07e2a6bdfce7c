//! Handles over full entity bodies.

use std::sync::Arc;

use arcs_keys::{ReferenceModeStorageKey, StorageKey};
use arcs_schema::Schema;
use arcs_store::{
    ListenerId, ReferenceModeCollection, ReferenceModeSingleton, StoreUpdate,
};
use arcs_types::{RawEntity, Reference};
use tracing::trace;

use crate::error::HandleResult;
use crate::handle::HandleCore;

/// Handle over at most one entity.
#[derive(Clone)]
pub struct SingletonHandle {
    core: HandleCore,
    store: ReferenceModeSingleton,
}

impl SingletonHandle {
    pub(crate) fn new(core: HandleCore, store: ReferenceModeSingleton) -> Self {
        Self { core, store }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn schema(&self) -> &Schema {
        &self.core.schema
    }

    pub fn storage_key(&self) -> &ReferenceModeStorageKey {
        self.store.storage_key()
    }

    /// `true` if `update` was caused by a write through this handle.
    pub fn is_own_update<V>(&self, update: &StoreUpdate<V>) -> bool {
        self.core.is_own(update)
    }

    /// Validate and store `entity`, replacing the current value.
    pub async fn store(&self, entity: RawEntity) -> HandleResult<()> {
        self.core.validate(&entity)?;
        trace!(handle = %self.core.name, id = %entity.id, "store");
        self.store.store(entity, self.core.origin()).await?;
        Ok(())
    }

    pub async fn fetch(&self) -> HandleResult<Option<RawEntity>> {
        Ok(self.store.fetch()?.map(|e| self.core.entity(e)))
    }

    pub async fn clear(&self) -> HandleResult<()> {
        self.store.clear(self.core.origin()).await?;
        Ok(())
    }

    /// Reference to `entity` in `backing_key`, storing its body there
    /// first if the backing store does not have it yet.
    pub async fn create_reference(
        &self,
        entity: &RawEntity,
        backing_key: &StorageKey,
    ) -> HandleResult<Reference> {
        self.core.stored_pointer(entity, backing_key).await
    }

    pub fn add_on_update<F>(&self, listener: F) -> HandleResult<ListenerId>
    where
        F: Fn(&StoreUpdate<Option<RawEntity>>) + Send + Sync + 'static,
    {
        let core = self.core.clone();
        Ok(self
            .store
            .add_on_update(Arc::new(move |update: &StoreUpdate<Option<RawEntity>>| {
                let update = update.clone().map(|value| value.map(|e| core.entity(e)));
                listener(&update);
            }))?)
    }

    pub fn remove_on_update(&self, id: ListenerId) -> HandleResult<bool> {
        Ok(self.store.remove_on_update(id)?)
    }
}

/// Handle over a set of entities.
#[derive(Clone)]
pub struct CollectionHandle {
    core: HandleCore,
    store: ReferenceModeCollection,
}

impl CollectionHandle {
    pub(crate) fn new(core: HandleCore, store: ReferenceModeCollection) -> Self {
        Self { core, store }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn schema(&self) -> &Schema {
        &self.core.schema
    }

    pub fn storage_key(&self) -> &ReferenceModeStorageKey {
        self.store.storage_key()
    }

    pub fn is_own_update<V>(&self, update: &StoreUpdate<V>) -> bool {
        self.core.is_own(update)
    }

    /// Validate and store `entity`, replacing any member with its id.
    pub async fn store(&self, entity: RawEntity) -> HandleResult<()> {
        self.core.validate(&entity)?;
        trace!(handle = %self.core.name, id = %entity.id, "store");
        self.store.store(entity, self.core.origin()).await?;
        Ok(())
    }

    /// Every member whose body is available, in id order.
    pub async fn fetch_all(&self) -> HandleResult<Vec<RawEntity>> {
        Ok(self
            .store
            .fetch_all()?
            .into_iter()
            .map(|e| self.core.entity(e))
            .collect())
    }

    pub async fn fetch_by_id(&self, id: &str) -> HandleResult<Option<RawEntity>> {
        Ok(self.store.fetch_by_id(id)?.map(|e| self.core.entity(e)))
    }

    pub async fn size(&self) -> HandleResult<usize> {
        Ok(self.store.size()?)
    }

    /// Remove the member with `id`. Its body stays in the backing store.
    pub async fn remove(&self, id: &str) -> HandleResult<()> {
        self.store.remove(id, self.core.origin()).await?;
        Ok(())
    }

    pub async fn clear(&self) -> HandleResult<()> {
        self.store.clear(self.core.origin()).await?;
        Ok(())
    }

    /// Reference to `entity` in `backing_key`, storing its body there
    /// first if the backing store does not have it yet.
    pub async fn create_reference(
        &self,
        entity: &RawEntity,
        backing_key: &StorageKey,
    ) -> HandleResult<Reference> {
        self.core.stored_pointer(entity, backing_key).await
    }

    pub fn add_on_update<F>(&self, listener: F) -> HandleResult<ListenerId>
    where
        F: Fn(&StoreUpdate<Vec<RawEntity>>) + Send + Sync + 'static,
    {
        let core = self.core.clone();
        Ok(self
            .store
            .add_on_update(Arc::new(move |update: &StoreUpdate<Vec<RawEntity>>| {
                let update = update
                    .clone()
                    .map(|value| value.into_iter().map(|e| core.entity(e)).collect());
                listener(&update);
            }))?)
    }

    pub fn remove_on_update(&self, id: ListenerId) -> HandleResult<bool> {
        Ok(self.store.remove_on_update(id)?)
    }
}
