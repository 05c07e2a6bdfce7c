//! Storage key types.

use std::fmt;

use arcs_types::ArcId;
use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};
use crate::names::{validate_component, validate_protocol};

/// Protocol of keys whose data lives only as long as its backend registry.
pub const VOLATILE_PROTOCOL: &str = "volatile";

/// Protocol of keys shared by every arc that uses the same backend registry.
pub const RAMDISK_PROTOCOL: &str = "ramdisk";

/// Arc id used by [`StorageKey::ramdisk`] keys.
pub const RAMDISK_ARC_ID: &str = "shared";

/// Hierarchical address of a single store.
///
/// The string form is `protocol://arcId/unique`, where `unique` is one or
/// more `/`-separated path segments. Keys compare and hash by all three
/// parts, so two keys are the same store iff their strings are equal.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StorageKey {
    protocol: String,
    arc_id: ArcId,
    unique: String,
}

impl StorageKey {
    /// Build a key from its parts, validating each one.
    pub fn new(protocol: &str, arc_id: ArcId, unique: &str) -> KeyResult<Self> {
        validate_protocol(protocol)?;
        validate_component(arc_id.as_str())?;
        for segment in unique.split('/') {
            validate_component(segment)?;
        }
        Ok(Self {
            protocol: protocol.to_string(),
            arc_id,
            unique: unique.to_string(),
        })
    }

    /// A `volatile://arcId/unique` key.
    pub fn volatile(arc_id: ArcId, unique: &str) -> KeyResult<Self> {
        Self::new(VOLATILE_PROTOCOL, arc_id, unique)
    }

    /// A `ramdisk://shared/unique` key.
    pub fn ramdisk(unique: &str) -> KeyResult<Self> {
        Self::new(RAMDISK_PROTOCOL, ArcId::from(RAMDISK_ARC_ID), unique)
    }

    /// Parse the part of a key string that follows `protocol://`.
    ///
    /// The first segment becomes the arc id, the rest the unique path.
    pub fn parse_path(protocol: &str, path: &str) -> KeyResult<Self> {
        let invalid = |reason: &str| KeyError::InvalidKeyFormat {
            key: format!("{protocol}://{path}"),
            reason: reason.to_string(),
        };
        let (arc_id, unique) = path
            .split_once('/')
            .ok_or_else(|| invalid("need at least one '/' after the arc id"))?;
        if arc_id.is_empty() {
            return Err(invalid("arc id must not be empty"));
        }
        if unique.is_empty() {
            return Err(invalid("path must not be empty"));
        }
        Self::new(protocol, ArcId::from(arc_id), unique).map_err(|e| invalid(&e.to_string()))
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn arc_id(&self) -> &ArcId {
        &self.arc_id
    }

    /// Everything after the arc id.
    pub fn unique(&self) -> &str {
        &self.unique
    }

    /// A new key one level below this one.
    pub fn child_key_with_component(&self, component: &str) -> KeyResult<Self> {
        validate_component(component)?;
        Ok(Self {
            protocol: self.protocol.clone(),
            arc_id: self.arc_id.clone(),
            unique: format!("{}/{component}", self.unique),
        })
    }

    /// `true` if `self` is `other` or lies below it.
    pub fn is_descendant_of(&self, other: &StorageKey) -> bool {
        self.protocol == other.protocol
            && self.arc_id == other.arc_id
            && (self.unique == other.unique
                || self
                    .unique
                    .strip_prefix(other.unique.as_str())
                    .is_some_and(|rest| rest.starts_with('/')))
    }

    pub fn to_key_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.protocol, self.arc_id, self.unique)
    }
}

impl fmt::Debug for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageKey({self})")
    }
}

/// Composite address of a reference-mode store.
///
/// Entity bodies live at `backing_key`; the pointers that make up the
/// logical singleton or collection live at `storage_key`. This pairs two
/// ordinary keys and is not itself a protocol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceModeStorageKey {
    pub backing_key: StorageKey,
    pub storage_key: StorageKey,
}

impl ReferenceModeStorageKey {
    pub fn new(backing_key: StorageKey, storage_key: StorageKey) -> Self {
        Self {
            backing_key,
            storage_key,
        }
    }
}

impl fmt::Display for ReferenceModeStorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reference-mode://{}|{}", self.backing_key, self.storage_key)
    }
}
