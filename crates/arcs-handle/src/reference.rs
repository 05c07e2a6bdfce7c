//! Handles over reference values.

use std::sync::Arc;

use arcs_keys::StorageKey;
use arcs_schema::Schema;
use arcs_store::{CollectionStore, ListenerId, SingletonStore, StoreUpdate};
use arcs_types::{RawEntity, Reference};

use crate::error::HandleResult;
use crate::handle::HandleCore;

/// Handle over at most one [`Reference`].
#[derive(Clone)]
pub struct ReferenceSingletonHandle {
    core: HandleCore,
    store: Arc<SingletonStore<Reference>>,
}

impl ReferenceSingletonHandle {
    pub(crate) fn new(core: HandleCore, store: Arc<SingletonStore<Reference>>) -> Self {
        Self { core, store }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn schema(&self) -> &Schema {
        &self.core.schema
    }

    pub fn storage_key(&self) -> &StorageKey {
        self.store.storage_key()
    }

    pub fn is_own_update<V>(&self, update: &StoreUpdate<V>) -> bool {
        self.core.is_own(update)
    }

    pub async fn store(&self, reference: Reference) -> HandleResult<()> {
        self.store.set(reference, self.core.origin()).await?;
        Ok(())
    }

    pub async fn fetch(&self) -> HandleResult<Option<Reference>> {
        Ok(self.store.get()?.map(|r| self.core.reference(r)))
    }

    pub async fn clear(&self) -> HandleResult<()> {
        self.store.clear(self.core.origin()).await?;
        Ok(())
    }

    /// Pointer to `entity` in `backing_key`. Nothing is written; the
    /// reference stays dead until someone stores the body there.
    pub fn create_reference(&self, entity: &RawEntity, backing_key: &StorageKey) -> Reference {
        self.core.pointer(&entity.id, backing_key)
    }

    pub fn add_on_update<F>(&self, listener: F) -> HandleResult<ListenerId>
    where
        F: Fn(&StoreUpdate<Option<Reference>>) + Send + Sync + 'static,
    {
        let core = self.core.clone();
        Ok(self
            .store
            .add_on_update(Arc::new(move |update: &StoreUpdate<Option<Reference>>| {
                let update = update.clone().map(|value| value.map(|r| core.reference(r)));
                listener(&update);
            }))?)
    }

    pub fn remove_on_update(&self, id: ListenerId) -> HandleResult<bool> {
        Ok(self.store.remove_on_update(id)?)
    }
}

/// Handle over a set of [`Reference`]s keyed by target id.
#[derive(Clone)]
pub struct ReferenceCollectionHandle {
    core: HandleCore,
    store: Arc<CollectionStore<Reference>>,
}

impl ReferenceCollectionHandle {
    pub(crate) fn new(core: HandleCore, store: Arc<CollectionStore<Reference>>) -> Self {
        Self { core, store }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn schema(&self) -> &Schema {
        &self.core.schema
    }

    pub fn storage_key(&self) -> &StorageKey {
        self.store.storage_key()
    }

    pub fn is_own_update<V>(&self, update: &StoreUpdate<V>) -> bool {
        self.core.is_own(update)
    }

    pub async fn store(&self, reference: Reference) -> HandleResult<()> {
        self.store.add(reference, self.core.origin()).await?;
        Ok(())
    }

    pub async fn fetch_all(&self) -> HandleResult<Vec<Reference>> {
        Ok(self
            .store
            .get_all()?
            .into_iter()
            .map(|r| self.core.reference(r))
            .collect())
    }

    pub async fn fetch_by_id(&self, id: &str) -> HandleResult<Option<Reference>> {
        Ok(self.store.get_by_id(id)?.map(|r| self.core.reference(r)))
    }

    pub async fn size(&self) -> HandleResult<usize> {
        Ok(self.store.len()?)
    }

    pub async fn remove(&self, id: &str) -> HandleResult<()> {
        self.store.remove(id, self.core.origin()).await?;
        Ok(())
    }

    pub async fn clear(&self) -> HandleResult<()> {
        self.store.clear(self.core.origin()).await?;
        Ok(())
    }

    /// Pointer to `entity` in `backing_key`. Nothing is written.
    pub fn create_reference(&self, entity: &RawEntity, backing_key: &StorageKey) -> Reference {
        self.core.pointer(&entity.id, backing_key)
    }

    pub fn add_on_update<F>(&self, listener: F) -> HandleResult<ListenerId>
    where
        F: Fn(&StoreUpdate<Vec<Reference>>) + Send + Sync + 'static,
    {
        let core = self.core.clone();
        Ok(self
            .store
            .add_on_update(Arc::new(move |update: &StoreUpdate<Vec<Reference>>| {
                let update = update
                    .clone()
                    .map(|value| value.into_iter().map(|r| core.reference(r)).collect());
                listener(&update);
            }))?)
    }

    pub fn remove_on_update(&self, id: ListenerId) -> HandleResult<bool> {
        Ok(self.store.remove_on_update(id)?)
    }
}
