//! Per-participant handle factory.

use std::fmt;
use std::sync::Arc;

use arcs_keys::{ReferenceModeStorageKey, StorageKey};
use arcs_schema::{Schema, SchemaRegistry};
use arcs_store::{Stores, StoresDereferencer};
use arcs_types::{ArcId, Dereferencer};
use tracing::debug;
use uuid::Uuid;

use crate::entity::{CollectionHandle, SingletonHandle};
use crate::error::{HandleError, HandleResult};
use crate::handle::HandleCore;
use crate::reference::{ReferenceCollectionHandle, ReferenceSingletonHandle};

/// Builds handles for one arc on one host.
///
/// All handles share the manager's [`Stores`] registry and its
/// dereferencer, so references they return resolve against that registry
/// only. Handles are bound to a schema that must be registered in the
/// manager's [`SchemaRegistry`]; construction fails before touching
/// storage otherwise.
pub struct HandleManager {
    arc_id: ArcId,
    host_id: String,
    stores: Stores,
    registry: Arc<SchemaRegistry>,
    dereferencer: Arc<dyn Dereferencer>,
}

impl HandleManager {
    pub fn new(
        arc_id: ArcId,
        host_id: impl Into<String>,
        stores: Stores,
        registry: Arc<SchemaRegistry>,
    ) -> Self {
        let dereferencer: Arc<dyn Dereferencer> =
            Arc::new(StoresDereferencer::new(stores.clone()));
        Self {
            arc_id,
            host_id: host_id.into(),
            stores,
            registry,
            dereferencer,
        }
    }

    pub fn arc_id(&self) -> &ArcId {
        &self.arc_id
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// The dereferencer attached to every reference this manager's
    /// handles return.
    pub fn dereferencer(&self) -> &Arc<dyn Dereferencer> {
        &self.dereferencer
    }

    /// Handle over one entity stored in reference mode at `key`.
    pub async fn raw_entity_singleton_handle(
        &self,
        key: &ReferenceModeStorageKey,
        schema: &Schema,
        name: Option<&str>,
    ) -> HandleResult<SingletonHandle> {
        let core = self.core(&key.to_string(), schema, name)?;
        let store = self.stores.reference_mode_singleton(key).await?;
        Ok(SingletonHandle::new(core, store))
    }

    /// Handle over a set of entities stored in reference mode at `key`.
    pub async fn raw_entity_collection_handle(
        &self,
        key: &ReferenceModeStorageKey,
        schema: &Schema,
        name: Option<&str>,
    ) -> HandleResult<CollectionHandle> {
        let core = self.core(&key.to_string(), schema, name)?;
        let store = self.stores.reference_mode_collection(key).await?;
        Ok(CollectionHandle::new(core, store))
    }

    /// Handle over one reference stored directly at `key`.
    pub async fn reference_singleton_handle(
        &self,
        key: &StorageKey,
        schema: &Schema,
        name: Option<&str>,
    ) -> HandleResult<ReferenceSingletonHandle> {
        let core = self.core(&key.to_string(), schema, name)?;
        let store = self.stores.singleton(key).await?;
        Ok(ReferenceSingletonHandle::new(core, store))
    }

    /// Handle over a set of references stored directly at `key`.
    pub async fn reference_collection_handle(
        &self,
        key: &StorageKey,
        schema: &Schema,
        name: Option<&str>,
    ) -> HandleResult<ReferenceCollectionHandle> {
        let core = self.core(&key.to_string(), schema, name)?;
        let store = self.stores.collection(key).await?;
        Ok(ReferenceCollectionHandle::new(core, store))
    }

    fn core(&self, key: &str, schema: &Schema, name: Option<&str>) -> HandleResult<HandleCore> {
        let spec = self
            .registry
            .get_entity_spec(&schema.hash)?
            .ok_or_else(|| HandleError::UnregisteredSchema {
                hash: schema.hash.clone(),
            })?;
        let name = name.unwrap_or(key).to_string();
        let origin = format!("{name}#{}", Uuid::now_v7().simple());
        debug!(arc = %self.arc_id, host = %self.host_id, %key, %origin, "handle created");
        Ok(HandleCore {
            name,
            origin,
            schema: schema.clone(),
            spec,
            stores: self.stores.clone(),
            dereferencer: Arc::clone(&self.dereferencer),
        })
    }
}

impl fmt::Debug for HandleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleManager")
            .field("arc_id", &self.arc_id)
            .field("host_id", &self.host_id)
            .field("stores", &self.stores)
            .finish_non_exhaustive()
    }
}
