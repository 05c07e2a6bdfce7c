//! Bodies in one store, pointers in another.
//!
//! A reference-mode store writes an entity's body into a backing
//! collection keyed by entity id and records only a [`Reference`] in its
//! own pointer store. Reads go the other way: take the pointers, then look
//! each body up in the backing collection as it is right now. Many pointer
//! stores can share one backing collection.
//!
//! Removing or clearing only drops pointers; bodies stay in the backing
//! collection for whoever else points at them. Listeners are driven by the
//! pointer store, so an edit made directly to a backing body is seen by
//! the next read, not announced.

use std::sync::Arc;

use arcs_keys::ReferenceModeStorageKey;
use arcs_types::{RawEntity, Reference};
use tracing::warn;

use crate::error::StoreResult;
use crate::store::{CollectionStore, ListenerId, SingletonStore, StoreUpdate, UpdateListener};

/// Write `entity` to `backing` and build the pointer to it.
async fn store_body(
    key: &ReferenceModeStorageKey,
    backing: &CollectionStore<RawEntity>,
    entity: RawEntity,
    origin: Option<&str>,
) -> StoreResult<Reference> {
    let id = entity.id.clone();
    backing.add(entity, origin).await?;
    pointer_to(key, backing, &id)
}

fn pointer_to(
    key: &ReferenceModeStorageKey,
    backing: &CollectionStore<RawEntity>,
    id: &str,
) -> StoreResult<Reference> {
    let reference = Reference::new(id, &key.backing_key);
    Ok(match backing.version_of(id)? {
        Some(version) => reference.with_version(version),
        None => reference,
    })
}

fn resolve(
    backing: &CollectionStore<RawEntity>,
    reference: &Reference,
) -> StoreResult<Option<RawEntity>> {
    backing.get_by_id(&reference.id)
}

/// Reference-mode store holding at most one entity.
#[derive(Clone)]
pub struct ReferenceModeSingleton {
    key: ReferenceModeStorageKey,
    backing: Arc<CollectionStore<RawEntity>>,
    pointers: Arc<SingletonStore<Reference>>,
}

impl ReferenceModeSingleton {
    pub fn new(
        key: ReferenceModeStorageKey,
        backing: Arc<CollectionStore<RawEntity>>,
        pointers: Arc<SingletonStore<Reference>>,
    ) -> Self {
        Self {
            key,
            backing,
            pointers,
        }
    }

    pub fn storage_key(&self) -> &ReferenceModeStorageKey {
        &self.key
    }

    pub fn backing(&self) -> &Arc<CollectionStore<RawEntity>> {
        &self.backing
    }

    pub fn pointers(&self) -> &Arc<SingletonStore<Reference>> {
        &self.pointers
    }

    /// Store the body, then point at it. Returns the pointer written.
    pub async fn store(&self, entity: RawEntity, origin: Option<&str>) -> StoreResult<Reference> {
        let reference = store_body(&self.key, &self.backing, entity, origin).await?;
        self.pointers.set(reference.clone(), origin).await?;
        Ok(reference)
    }

    /// The pointed-at body, or `None` if there is no pointer or its body is
    /// not in the backing collection.
    pub fn fetch(&self) -> StoreResult<Option<RawEntity>> {
        match self.pointers.get()? {
            Some(reference) => resolve(&self.backing, &reference),
            None => Ok(None),
        }
    }

    /// The current pointer, without resolving it.
    pub fn fetch_reference(&self) -> StoreResult<Option<Reference>> {
        self.pointers.get()
    }

    /// Drop the pointer. The body stays in the backing collection.
    pub async fn clear(&self, origin: Option<&str>) -> StoreResult<bool> {
        self.pointers.clear(origin).await
    }

    /// Listen for pointer changes; each update carries the resolved body.
    ///
    /// An update whose body cannot be read from the backing collection is
    /// logged and not delivered; the next fetch reports the error.
    pub fn add_on_update(
        &self,
        listener: UpdateListener<Option<RawEntity>>,
    ) -> StoreResult<ListenerId> {
        let backing = Arc::clone(&self.backing);
        self.pointers
            .add_on_update(Arc::new(move |update: &StoreUpdate<Option<Reference>>| {
                let resolved = match &update.value {
                    Some(reference) => resolve(&backing, reference),
                    None => Ok(None),
                };
                match resolved {
                    Ok(value) => listener(&StoreUpdate {
                        value,
                        origin: update.origin.clone(),
                    }),
                    Err(e) => warn!(key = %backing.storage_key(), error = %e, "dropping update"),
                }
            }))
    }

    pub fn remove_on_update(&self, id: ListenerId) -> StoreResult<bool> {
        self.pointers.remove_on_update(id)
    }
}

/// Reference-mode store holding a set of entities.
#[derive(Clone)]
pub struct ReferenceModeCollection {
    key: ReferenceModeStorageKey,
    backing: Arc<CollectionStore<RawEntity>>,
    pointers: Arc<CollectionStore<Reference>>,
}

impl ReferenceModeCollection {
    pub fn new(
        key: ReferenceModeStorageKey,
        backing: Arc<CollectionStore<RawEntity>>,
        pointers: Arc<CollectionStore<Reference>>,
    ) -> Self {
        Self {
            key,
            backing,
            pointers,
        }
    }

    pub fn storage_key(&self) -> &ReferenceModeStorageKey {
        &self.key
    }

    pub fn backing(&self) -> &Arc<CollectionStore<RawEntity>> {
        &self.backing
    }

    pub fn pointers(&self) -> &Arc<CollectionStore<Reference>> {
        &self.pointers
    }

    pub async fn store(&self, entity: RawEntity, origin: Option<&str>) -> StoreResult<Reference> {
        let reference = store_body(&self.key, &self.backing, entity, origin).await?;
        self.pointers.add(reference.clone(), origin).await?;
        Ok(reference)
    }

    /// Every pointed-at body that the backing collection holds, in id order.
    pub fn fetch_all(&self) -> StoreResult<Vec<RawEntity>> {
        let mut entities = Vec::new();
        for reference in self.pointers.get_all()? {
            if let Some(entity) = resolve(&self.backing, &reference)? {
                entities.push(entity);
            }
        }
        Ok(entities)
    }

    pub fn fetch_by_id(&self, id: &str) -> StoreResult<Option<RawEntity>> {
        if !self.pointers.contains(id)? {
            return Ok(None);
        }
        self.backing.get_by_id(id)
    }

    pub fn fetch_references(&self) -> StoreResult<Vec<Reference>> {
        self.pointers.get_all()
    }

    /// Number of pointers, resolvable or not.
    pub fn size(&self) -> StoreResult<usize> {
        self.pointers.len()
    }

    pub async fn remove(&self, id: &str, origin: Option<&str>) -> StoreResult<bool> {
        self.pointers.remove(id, origin).await
    }

    pub async fn clear(&self, origin: Option<&str>) -> StoreResult<bool> {
        self.pointers.clear(origin).await
    }

    /// Listen for pointer changes; each update carries every resolvable
    /// body. Updates hitting a backing read error are logged and dropped.
    pub fn add_on_update(&self, listener: UpdateListener<Vec<RawEntity>>) -> StoreResult<ListenerId> {
        let backing = Arc::clone(&self.backing);
        self.pointers
            .add_on_update(Arc::new(move |update: &StoreUpdate<Vec<Reference>>| {
                let resolved: StoreResult<Vec<RawEntity>> = update
                    .value
                    .iter()
                    .filter_map(|reference| resolve(&backing, reference).transpose())
                    .collect();
                match resolved {
                    Ok(value) => listener(&StoreUpdate {
                        value,
                        origin: update.origin.clone(),
                    }),
                    Err(e) => warn!(key = %backing.storage_key(), error = %e, "dropping update"),
                }
            }))
    }

    pub fn remove_on_update(&self, id: ListenerId) -> StoreResult<bool> {
        self.pointers.remove_on_update(id)
    }
}
