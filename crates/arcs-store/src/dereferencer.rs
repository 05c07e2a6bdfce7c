use std::sync::Arc;

use arcs_types::{Dereferencer, RawEntity, Reference, TypeError, TypeResult};
use async_trait::async_trait;
use tracing::trace;

use crate::error::StoreResult;
use crate::registry::Stores;

/// Resolves references against the backing collections of one registry.
///
/// The reference's storage key is parsed with the registry's parser and
/// the collection at that key is opened (or reused) in the same registry,
/// so a reference only ever sees data written through that registry. Once
/// the registry is torn down every reference resolves to nothing.
#[derive(Clone, Debug)]
pub struct StoresDereferencer {
    stores: Stores,
}

impl StoresDereferencer {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    async fn lookup(&self, reference: &Reference) -> StoreResult<Option<RawEntity>> {
        let key = self.stores.parse_key(&reference.storage_key)?;
        let backing = self.stores.collection::<RawEntity>(&key).await?;
        backing.get_by_id(&reference.id)
    }
}

#[async_trait]
impl Dereferencer for StoresDereferencer {
    async fn dereference(&self, reference: &Reference) -> TypeResult<Option<RawEntity>> {
        if self.stores.is_torn_down() {
            return Ok(None);
        }
        let entity = self
            .lookup(reference)
            .await
            .map_err(|e| TypeError::Dereference {
                id: reference.id.clone(),
                reason: e.to_string(),
            })?;
        trace!(
            id = %reference.id,
            key = %reference.storage_key,
            found = entity.is_some(),
            "dereferenced"
        );
        let this: Arc<dyn Dereferencer> = Arc::new(self.clone());
        Ok(entity.map(|mut entity| {
            entity.attach_dereferencer(&this);
            entity
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcs_keys::StorageKey;
    use arcs_types::ArcId;

    fn backing_key() -> StorageKey {
        StorageKey::volatile(ArcId::new_for_test("arc"), "entities").unwrap()
    }

    #[tokio::test]
    async fn reference_tracks_live_backing_store() {
        let stores = Stores::new();
        let deref: Arc<dyn Dereferencer> = Arc::new(StoresDereferencer::new(stores.clone()));
        let reference = Reference::new("e1", backing_key()).with_dereferencer(deref);

        assert!(reference.is_dead().await.unwrap());

        let backing = stores.collection::<RawEntity>(&backing_key()).await.unwrap();
        backing
            .add(RawEntity::new("e1").with_singleton("name", "Jason"), None)
            .await
            .unwrap();
        assert!(reference.is_alive().await.unwrap());

        backing
            .add(RawEntity::new("e1").with_singleton("name", "Ben"), None)
            .await
            .unwrap();
        let entity = reference.dereference().await.unwrap().unwrap();
        assert_eq!(
            entity.singleton("name").and_then(|v| v.as_text()),
            Some("Ben")
        );
    }

    #[tokio::test]
    async fn other_registry_sees_nothing() {
        let writer = Stores::new();
        writer
            .collection::<RawEntity>(&backing_key())
            .await
            .unwrap()
            .add(RawEntity::new("e1"), None)
            .await
            .unwrap();

        let reader = StoresDereferencer::new(Stores::new());
        let reference = Reference::new("e1", backing_key());
        assert_eq!(reference.dereference_with(&reader).await.unwrap(), None);
    }

    #[tokio::test]
    async fn nested_references_get_the_dereferencer() {
        let stores = Stores::new();
        let hat = Reference::new("hat", backing_key());
        let backing = stores.collection::<RawEntity>(&backing_key()).await.unwrap();
        backing
            .add(RawEntity::new("e1").with_singleton("hat", hat), None)
            .await
            .unwrap();

        let reader = StoresDereferencer::new(stores);
        let outer = Reference::new("e1", backing_key())
            .dereference_with(&reader)
            .await
            .unwrap()
            .unwrap();
        assert!(outer.reference("hat").unwrap().has_dereferencer());
    }

    #[tokio::test]
    async fn unparseable_key_is_an_error_and_teardown_is_not() {
        let stores = Stores::new();
        let reader = StoresDereferencer::new(stores.clone());
        let bad = Reference::new("e1", "no-protocol-here");
        assert!(matches!(
            bad.dereference_with(&reader).await,
            Err(TypeError::Dereference { .. })
        ));

        stores.teardown().await.unwrap();
        let good = Reference::new("e1", backing_key());
        assert_eq!(good.dereference_with(&reader).await.unwrap(), None);
    }
}
