use std::sync::Arc;

use arcs_keys::StorageKey;
use arcs_schema::{EntitySpec, Schema};
use arcs_store::{StoreUpdate, Stores};
use arcs_types::{Dereferencer, RawEntity, Reference};

use crate::error::HandleResult;

/// State shared by every handle kind.
#[derive(Clone)]
pub(crate) struct HandleCore {
    pub(crate) name: String,
    /// Tag written with every change, unique to this handle.
    pub(crate) origin: String,
    pub(crate) schema: Schema,
    pub(crate) spec: Arc<dyn EntitySpec>,
    pub(crate) stores: Stores,
    pub(crate) dereferencer: Arc<dyn Dereferencer>,
}

impl HandleCore {
    pub(crate) fn origin(&self) -> Option<&str> {
        Some(self.origin.as_str())
    }

    pub(crate) fn is_own<V>(&self, update: &StoreUpdate<V>) -> bool {
        update.is_from(&self.origin)
    }

    pub(crate) fn validate(&self, entity: &RawEntity) -> HandleResult<()> {
        Ok(self.spec.validate(entity)?)
    }

    pub(crate) fn entity(&self, mut entity: RawEntity) -> RawEntity {
        entity.attach_dereferencer(&self.dereferencer);
        entity
    }

    pub(crate) fn reference(&self, reference: Reference) -> Reference {
        reference.with_dereferencer(Arc::clone(&self.dereferencer))
    }

    /// Pointer to `id` in `backing_key`, without touching storage.
    pub(crate) fn pointer(&self, id: &str, backing_key: &StorageKey) -> Reference {
        self.reference(Reference::new(id, backing_key))
    }

    /// Make sure `entity` has a body in `backing_key`, then point at it.
    pub(crate) async fn stored_pointer(
        &self,
        entity: &RawEntity,
        backing_key: &StorageKey,
    ) -> HandleResult<Reference> {
        let backing = self.stores.collection::<RawEntity>(backing_key).await?;
        if !backing.contains(&entity.id)? {
            self.validate(entity)?;
            backing.add(entity.clone(), self.origin()).await?;
        }
        let reference = Reference::new(&entity.id, backing_key);
        let reference = match backing.version_of(&entity.id)? {
            Some(version) => reference.with_version(version),
            None => reference,
        };
        Ok(self.reference(reference))
    }
}
