use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{TypeError, TypeResult};
use crate::reference::{Dereferencer, Reference};
use crate::value::FieldValue;
use crate::version::VersionMap;
use crate::FieldName;

/// Untyped entity body.
///
/// Identity is `id`; two entities are equal iff their ids and every field
/// value are equal. A singleton field explicitly set to `None` is distinct
/// from a field that is absent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawEntity {
    pub id: String,
    pub singletons: BTreeMap<FieldName, Option<FieldValue>>,
    pub collections: BTreeMap<FieldName, BTreeSet<FieldValue>>,
}

impl RawEntity {
    /// An entity with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            singletons: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    pub fn with_singleton(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.singletons.insert(field.to_string(), Some(value.into()));
        self
    }

    /// Declare a singleton field that currently holds no value.
    pub fn with_null(mut self, field: &str) -> Self {
        self.singletons.insert(field.to_string(), None);
        self
    }

    pub fn with_collection<V, I>(mut self, field: &str, values: I) -> Self
    where
        V: Into<FieldValue>,
        I: IntoIterator<Item = V>,
    {
        self.collections
            .insert(field.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Value of a singleton field, `None` when absent or null.
    pub fn singleton(&self, field: &str) -> Option<&FieldValue> {
        self.singletons.get(field).and_then(Option::as_ref)
    }

    /// Reference held by a singleton field, if it holds one.
    pub fn reference(&self, field: &str) -> Option<&Reference> {
        self.singleton(field).and_then(FieldValue::as_reference)
    }

    pub fn collection(&self, field: &str) -> Option<&BTreeSet<FieldValue>> {
        self.collections.get(field)
    }

    /// Names of every field, singletons first.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.singletons
            .keys()
            .chain(self.collections.keys())
            .map(String::as_str)
    }

    /// Every reference held directly by a field of this entity.
    pub fn references(&self) -> Vec<&Reference> {
        let singles = self.singletons.values().flatten();
        let multis = self.collections.values().flatten();
        singles
            .chain(multis)
            .filter_map(FieldValue::as_reference)
            .collect()
    }

    /// Wire every field-level reference to `dereferencer`.
    ///
    /// Collection members are rebuilt because set elements cannot be
    /// mutated in place; ordering ignores the dereferencer so the set is
    /// unchanged.
    pub fn attach_dereferencer(&mut self, dereferencer: &Arc<dyn Dereferencer>) {
        for value in self.singletons.values_mut().flatten() {
            if let Some(reference) = value.as_reference_mut() {
                reference.set_dereferencer(dereferencer.clone());
            }
        }
        for values in self.collections.values_mut() {
            if !values.iter().any(|v| v.as_reference().is_some()) {
                continue;
            }
            *values = std::mem::take(values)
                .into_iter()
                .map(|mut value| {
                    if let Some(reference) = value.as_reference_mut() {
                        reference.set_dereferencer(dereferencer.clone());
                    }
                    value
                })
                .collect();
        }
    }

    /// Language-neutral wire shape: scalars inline, references as
    /// `{ id, storageKey, version? }`, nulls as `null`.
    ///
    /// JSON has no NaN or infinity, so an entity holding a non-finite
    /// number fails with [`TypeError::NonFiniteNumber`].
    pub fn to_json(&self) -> TypeResult<Value> {
        let mut singletons = Map::new();
        for (field, value) in &self.singletons {
            let encoded = match value {
                Some(value) => value_to_json(field, value)?,
                None => Value::Null,
            };
            singletons.insert(field.clone(), encoded);
        }
        let mut collections = Map::new();
        for (field, values) in &self.collections {
            let encoded = values
                .iter()
                .map(|value| value_to_json(field, value))
                .collect::<TypeResult<Vec<_>>>()?;
            collections.insert(field.clone(), Value::Array(encoded));
        }
        Ok(json!({
            "id": self.id,
            "singletons": singletons,
            "collections": collections,
        }))
    }

    /// Parse the wire shape produced by [`to_json`](Self::to_json).
    pub fn from_json(value: &Value) -> TypeResult<Self> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| TypeError::MalformedJson("missing string `id`".into()))?;
        let mut entity = RawEntity::new(id);

        if let Some(singletons) = value.get("singletons") {
            let singletons = singletons
                .as_object()
                .ok_or_else(|| TypeError::MalformedJson("`singletons` must be an object".into()))?;
            for (field, raw) in singletons {
                let parsed = match raw {
                    Value::Null => None,
                    other => Some(value_from_json(other)?),
                };
                entity.singletons.insert(field.clone(), parsed);
            }
        }

        if let Some(collections) = value.get("collections") {
            let collections = collections
                .as_object()
                .ok_or_else(|| TypeError::MalformedJson("`collections` must be an object".into()))?;
            for (field, raw) in collections {
                let items = raw.as_array().ok_or_else(|| {
                    TypeError::MalformedJson(format!("collection `{field}` must be an array"))
                })?;
                let values = items
                    .iter()
                    .map(value_from_json)
                    .collect::<TypeResult<BTreeSet<_>>>()?;
                entity.collections.insert(field.clone(), values);
            }
        }

        Ok(entity)
    }
}

fn value_to_json(field: &str, value: &FieldValue) -> TypeResult<Value> {
    Ok(match value {
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .ok_or_else(|| TypeError::NonFiniteNumber {
                field: field.to_string(),
                value: n.to_string(),
            })?,
        FieldValue::Boolean(b) => Value::Bool(*b),
        FieldValue::Reference(r) => {
            let mut pointer = Map::new();
            pointer.insert("id".into(), Value::String(r.id.clone()));
            pointer.insert("storageKey".into(), Value::String(r.storage_key.clone()));
            if let Some(version) = &r.version {
                let clocks: Map<String, Value> = version
                    .actors()
                    .map(|(actor, time)| (actor.to_string(), Value::from(time)))
                    .collect();
                pointer.insert("version".into(), Value::Object(clocks));
            }
            Value::Object(pointer)
        }
    })
}

fn value_from_json(value: &Value) -> TypeResult<FieldValue> {
    match value {
        Value::String(s) => Ok(FieldValue::Text(s.clone())),
        Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Number)
            .ok_or_else(|| TypeError::MalformedJson(format!("unrepresentable number {n}"))),
        Value::Object(pointer) => {
            let id = pointer.get("id").and_then(Value::as_str);
            let key = pointer.get("storageKey").and_then(Value::as_str);
            let (Some(id), Some(key)) = (id, key) else {
                return Err(TypeError::MalformedJson(
                    "reference needs string `id` and `storageKey`".into(),
                ));
            };
            let mut reference = Reference::new(id, key);
            if let Some(version) = pointer.get("version").and_then(Value::as_object) {
                let clocks = version
                    .iter()
                    .map(|(actor, time)| {
                        time.as_u64().map(|t| (actor.clone(), t)).ok_or_else(|| {
                            TypeError::MalformedJson(format!("bad version entry for {actor}"))
                        })
                    })
                    .collect::<TypeResult<Vec<_>>>()?;
                reference = reference.with_version(clocks.into_iter().collect::<VersionMap>());
            }
            Ok(FieldValue::Reference(reference))
        }
        other => Err(TypeError::MalformedJson(format!(
            "unsupported field value {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> RawEntity {
        RawEntity::new("entity1")
            .with_singleton("name", "Jason")
            .with_singleton("age", 21)
            .with_singleton("is_cool", false)
            .with_singleton(
                "best_friend",
                Reference::new("entity2", "ramdisk://shared/entities"),
            )
            .with_null("hat")
    }

    #[test]
    fn null_differs_from_absent() {
        let with_null = RawEntity::new("e").with_null("hat");
        let without = RawEntity::new("e");
        assert_ne!(with_null, without);
        assert!(with_null.singleton("hat").is_none());
    }

    #[test]
    fn references_lists_every_field_reference() {
        let entity = person().with_collection(
            "friends",
            [
                Reference::new("a", "k"),
                Reference::new("b", "k"),
            ],
        );
        let ids: Vec<&str> = entity.references().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["entity2", "a", "b"]);
    }

    #[test]
    fn json_wire_shape_is_untagged() {
        let json = person().to_json().unwrap();
        assert_eq!(json["id"], "entity1");
        assert_eq!(json["singletons"]["name"], "Jason");
        assert_eq!(json["singletons"]["age"], 21.0);
        assert_eq!(json["singletons"]["hat"], Value::Null);
        assert_eq!(json["singletons"]["best_friend"]["id"], "entity2");
        assert_eq!(
            json["singletons"]["best_friend"]["storageKey"],
            "ramdisk://shared/entities"
        );
        assert!(json["singletons"]["best_friend"].get("version").is_none());
    }

    #[test]
    fn json_parses_back_to_equal_entity() {
        let mut version = VersionMap::new();
        version.increment("writer");
        let entity = person()
            .with_collection("tags", ["x", "y"])
            .with_singleton("pinned", Reference::new("p", "k").with_version(version));
        let parsed = RawEntity::from_json(&entity.to_json().unwrap()).unwrap();
        assert_eq!(parsed, entity);
    }

    #[test]
    fn json_rejects_non_finite_singleton() {
        let entity = RawEntity::new("e").with_singleton("x", f64::NAN);
        assert_eq!(
            entity.to_json().unwrap_err(),
            TypeError::NonFiniteNumber {
                field: "x".into(),
                value: "NaN".into()
            }
        );
    }

    #[test]
    fn json_rejects_non_finite_collection_member() {
        let entity = RawEntity::new("e").with_collection("xs", [1.5, f64::INFINITY]);
        assert_eq!(
            entity.to_json().unwrap_err(),
            TypeError::NonFiniteNumber {
                field: "xs".into(),
                value: "inf".into()
            }
        );
        let finite = RawEntity::new("e").with_collection("xs", [1.5, -2.0]);
        assert_eq!(RawEntity::from_json(&finite.to_json().unwrap()).unwrap(), finite);
    }

    #[test]
    fn json_rejects_missing_id() {
        let err = RawEntity::from_json(&json!({ "singletons": {} })).unwrap_err();
        assert!(matches!(err, TypeError::MalformedJson(_)));
    }

    #[test]
    fn json_rejects_array_singleton() {
        let err = RawEntity::from_json(&json!({ "id": "e", "singletons": { "x": [1] } }));
        assert!(err.is_err());
    }

    #[test]
    fn attach_reaches_collection_members() {
        struct Never;
        #[async_trait::async_trait]
        impl Dereferencer for Never {
            async fn dereference(&self, _: &Reference) -> TypeResult<Option<RawEntity>> {
                Ok(None)
            }
        }

        let mut entity = person().with_collection("friends", [Reference::new("a", "k")]);
        let dereferencer: Arc<dyn Dereferencer> = Arc::new(Never);
        entity.attach_dereferencer(&dereferencer);
        assert!(entity.references().iter().all(|r| r.has_dereferencer()));
    }
}
