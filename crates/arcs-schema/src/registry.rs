//! Schema hash -> (schema, entity spec) lookup.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use arcs_types::RawEntity;
use tracing::{debug, info};

use crate::error::SchemaResult;
use crate::schema::{Schema, SchemaHash};

/// Describes how entities of one schema are checked before storage.
pub trait EntitySpec: Send + Sync {
    fn schema(&self) -> &Schema;

    /// Check that `entity` fits the schema. The default checks field names
    /// and value kinds.
    fn validate(&self, entity: &RawEntity) -> SchemaResult<()> {
        self.schema().validate_entity(entity)
    }
}

/// [`EntitySpec`] that stores entities exactly as given.
#[derive(Debug, Clone)]
pub struct RawEntitySpec {
    schema: Schema,
}

impl RawEntitySpec {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

impl EntitySpec for RawEntitySpec {
    fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Registry of known schemas.
///
/// Meant to be built once at startup and shared as `Arc<SchemaRegistry>`
/// with everything that needs schema lookups. Registering a hash that is
/// already present replaces the earlier entry.
#[derive(Default)]
pub struct SchemaRegistry {
    entries: RwLock<HashMap<SchemaHash, Arc<dyn EntitySpec>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry populated with `specs`, in order. Later specs replace
    /// earlier ones with the same hash.
    pub fn with_specs<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn EntitySpec>>,
    {
        let entries = specs
            .into_iter()
            .map(|spec| (spec.schema().hash.clone(), spec))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Insert `spec` under its schema's hash. Returns `true` if an earlier
    /// registration was replaced.
    pub fn register(&self, spec: Arc<dyn EntitySpec>) -> SchemaResult<bool> {
        let hash = spec.schema().hash.clone();
        let replaced = self.entries.write()?.insert(hash.clone(), spec).is_some();
        if replaced {
            info!(%hash, "schema registration replaced");
        } else {
            debug!(%hash, "schema registered");
        }
        Ok(replaced)
    }

    pub fn get_schema(&self, hash: &str) -> SchemaResult<Option<Schema>> {
        Ok(self
            .get_entity_spec(hash)?
            .map(|spec| spec.schema().clone()))
    }

    pub fn get_entity_spec(&self, hash: &str) -> SchemaResult<Option<Arc<dyn EntitySpec>>> {
        Ok(self.entries.read()?.get(hash).cloned())
    }

    pub fn contains(&self, hash: &str) -> SchemaResult<bool> {
        Ok(self.entries.read()?.contains_key(hash))
    }

    pub fn len(&self) -> SchemaResult<usize> {
        Ok(self.entries.read()?.len())
    }

    pub fn is_empty(&self) -> SchemaResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Registered hashes, sorted.
    pub fn hashes(&self) -> SchemaResult<Vec<SchemaHash>> {
        let mut hashes: Vec<SchemaHash> = self.entries.read()?.keys().cloned().collect();
        hashes.sort();
        Ok(hashes)
    }

    /// Remove every registration. Test setup only.
    pub fn clear_for_test(&self) -> SchemaResult<()> {
        self.entries.write()?.clear();
        Ok(())
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SchemaRegistry");
        match self.hashes() {
            Ok(hashes) => debug.field("hashes", &hashes),
            Err(_) => debug.field("hashes", &"<poisoned>"),
        };
        debug.finish()
    }
}
