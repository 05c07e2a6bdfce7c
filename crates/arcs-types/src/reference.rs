//! Weak pointers between entities.
//!
//! A [`Reference`] names an entity by id and the backing store that holds
//! its body. It owns nothing: whether the target exists is decided at the
//! moment of asking, by reading the backing store through a
//! [`Dereferencer`]. Handles attach their dereferencer to every reference
//! they hand out, so the pointer resolves against the storage of the
//! participant that read it.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entity::RawEntity;
use crate::error::{TypeError, TypeResult};
use crate::version::VersionMap;

/// Resolves references against live storage.
///
/// Implementations must perform a fresh read on every call; a returned
/// entity must never come from a cache populated when the reference was
/// created. An absent target is `Ok(None)`.
#[async_trait]
pub trait Dereferencer: Send + Sync {
    async fn dereference(&self, reference: &Reference) -> TypeResult<Option<RawEntity>>;
}

/// Pointer to an entity body held in a backing store.
///
/// Equality, ordering and hashing use `id`, `storage_key` and `version`;
/// the attached dereferencer is ignored.
#[derive(Clone, Serialize, Deserialize)]
pub struct Reference {
    /// Id of the target entity.
    pub id: String,
    /// String form of the backing store key that holds the body.
    #[serde(rename = "storageKey")]
    pub storage_key: String,
    /// Version of the body recorded when the pointer was written, if known.
    #[serde(default)]
    pub version: Option<VersionMap>,
    #[serde(skip)]
    dereferencer: Option<Arc<dyn Dereferencer>>,
}

impl Reference {
    pub fn new(id: impl Into<String>, storage_key: impl fmt::Display) -> Self {
        Self {
            id: id.into(),
            storage_key: storage_key.to_string(),
            version: None,
            dereferencer: None,
        }
    }

    pub fn with_version(mut self, version: VersionMap) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_dereferencer(mut self, dereferencer: Arc<dyn Dereferencer>) -> Self {
        self.dereferencer = Some(dereferencer);
        self
    }

    pub fn set_dereferencer(&mut self, dereferencer: Arc<dyn Dereferencer>) {
        self.dereferencer = Some(dereferencer);
    }

    pub fn has_dereferencer(&self) -> bool {
        self.dereferencer.is_some()
    }

    /// Read the target's current body through the attached dereferencer.
    ///
    /// Resolves exactly one hop: references inside the returned entity are
    /// left as references.
    pub async fn dereference(&self) -> TypeResult<Option<RawEntity>> {
        let dereferencer = self
            .dereferencer
            .as_ref()
            .ok_or_else(|| TypeError::NoDereferencer {
                id: self.id.clone(),
            })?;
        dereferencer.dereference(self).await
    }

    /// Read the target through an explicit dereferencer, ignoring the
    /// attached one.
    pub async fn dereference_with(
        &self,
        dereferencer: &dyn Dereferencer,
    ) -> TypeResult<Option<RawEntity>> {
        dereferencer.dereference(self).await
    }

    /// `true` if the backing store currently holds the target.
    pub async fn is_alive(&self) -> TypeResult<bool> {
        Ok(self.dereference().await?.is_some())
    }

    /// Complement of [`is_alive`](Self::is_alive).
    pub async fn is_dead(&self) -> TypeResult<bool> {
        Ok(!self.is_alive().await?)
    }

    fn identity(&self) -> (&str, &str, Option<&VersionMap>) {
        (&self.id, &self.storage_key, self.version.as_ref())
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Reference {}

impl PartialOrd for Reference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Reference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("id", &self.id)
            .field("storage_key", &self.storage_key)
            .field("version", &self.version)
            .finish()
    }
}
