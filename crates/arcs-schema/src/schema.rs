//! Schema types and field traversal.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use arcs_types::{FieldName, FieldValue, RawEntity};
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::registry::SchemaRegistry;
use crate::selector::Selector;

/// Identity of a field shape.
pub type SchemaHash = String;

const HASH_DOMAIN: &str = "arcs-schema-v1";

/// A name a schema is known by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaName(String);

impl SchemaName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SchemaName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// Reference to an entity whose schema has this hash.
    EntityRef(SchemaHash),
    /// Entity stored by value inside the field.
    InlineEntity(Box<SchemaFields>),
    /// Fixed-length tuple of at most five components.
    Tuple(Vec<FieldType>),
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::EntityRef(_) => "reference",
            FieldType::InlineEntity(_) => "inline entity",
            FieldType::Tuple(_) => "tuple",
        }
    }

    /// `true` if `value` may be stored in a field of this type.
    ///
    /// Inline entities and tuples have no flat value form and are not
    /// checked.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FieldType::Text, FieldValue::Text(_))
            | (FieldType::Number, FieldValue::Number(_))
            | (FieldType::Boolean, FieldValue::Boolean(_))
            | (FieldType::EntityRef(_), FieldValue::Reference(_)) => true,
            (FieldType::InlineEntity(_), _) | (FieldType::Tuple(_), _) => true,
            _ => false,
        }
    }
}

/// Singleton and collection field declarations, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFields {
    pub singletons: BTreeMap<FieldName, FieldType>,
    pub collections: BTreeMap<FieldName, FieldType>,
}

impl SchemaFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_singleton(mut self, name: &str, field_type: FieldType) -> Self {
        self.singletons.insert(name.to_string(), field_type);
        self
    }

    pub fn with_collection(mut self, name: &str, field_type: FieldType) -> Self {
        self.collections.insert(name.to_string(), field_type);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.singletons.is_empty() && self.collections.is_empty()
    }
}

/// Field layout of an entity type.
///
/// Immutable once built. `hash` is trusted to identify the field shape;
/// nothing checks two schemas with the same hash for agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub names: BTreeSet<SchemaName>,
    pub fields: SchemaFields,
    pub hash: SchemaHash,
}

impl Schema {
    /// A schema with an explicit hash.
    pub fn new<N>(names: N, fields: SchemaFields, hash: impl Into<SchemaHash>) -> Self
    where
        N: IntoIterator,
        N::Item: Into<SchemaName>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            fields,
            hash: hash.into(),
        }
    }

    /// A schema whose hash is derived from its names and fields.
    pub fn with_computed_hash<N>(names: N, fields: SchemaFields) -> SchemaResult<Self>
    where
        N: IntoIterator,
        N::Item: Into<SchemaName>,
    {
        let names: BTreeSet<SchemaName> = names.into_iter().map(Into::into).collect();
        let hash = Self::compute_hash(&names, &fields)?;
        Ok(Self {
            names,
            fields,
            hash,
        })
    }

    /// Domain-separated BLAKE3 over the JSON form of names and fields,
    /// hex encoded.
    pub fn compute_hash(names: &BTreeSet<SchemaName>, fields: &SchemaFields) -> SchemaResult<SchemaHash> {
        let data = serde_json::to_vec(&(names, fields))
            .map_err(|e| SchemaError::Serialization(e.to_string()))?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_DOMAIN.as_bytes());
        hasher.update(b":");
        hasher.update(&data);
        Ok(hex::encode(hasher.finalize().as_bytes()))
    }

    /// The first name, if the schema has any.
    pub fn name(&self) -> Option<&SchemaName> {
        self.names.iter().next()
    }

    /// Declared type of `field`, looking at singletons first.
    pub fn field_type(&self, field: &str) -> Option<&FieldType> {
        self.fields
            .singletons
            .get(field)
            .or_else(|| self.fields.collections.get(field))
    }

    /// Check that every field of `entity` is declared with a matching type.
    /// Declared fields the entity lacks are fine.
    pub fn validate_entity(&self, entity: &RawEntity) -> SchemaResult<()> {
        for (field, value) in &entity.singletons {
            let declared = self.declared(&self.fields.singletons, field)?;
            if let Some(value) = value {
                check_value(field, declared, value)?;
            }
        }
        for (field, values) in &entity.collections {
            let declared = self.declared(&self.fields.collections, field)?;
            for value in values {
                check_value(field, declared, value)?;
            }
        }
        Ok(())
    }

    fn declared<'a>(
        &self,
        fields: &'a BTreeMap<FieldName, FieldType>,
        field: &str,
    ) -> SchemaResult<&'a FieldType> {
        fields.get(field).ok_or_else(|| SchemaError::UnknownField {
            schema: self
                .name()
                .map_or_else(|| self.hash.clone(), |n| n.to_string()),
            field: field.to_string(),
        })
    }

    /// Call `visitor` with the access path and type of every field,
    /// depth first.
    ///
    /// Singletons come before collections and names are visited in sorted
    /// order. Inline entities and tuple components are descended into, and
    /// so are entity references whose target schema is in `registry`. A
    /// schema already on the current path is not entered again, so
    /// self-referencing schemas terminate.
    pub fn visit_fields<F>(&self, registry: Option<&SchemaRegistry>, mut visitor: F) -> SchemaResult<()>
    where
        F: FnMut(&[Selector], &FieldType),
    {
        let mut walk = Walk {
            registry,
            path: Vec::new(),
            entered: vec![self.hash.clone()],
            visitor: &mut visitor,
        };
        walk.fields(&self.fields)
    }
}

fn check_value(field: &str, declared: &FieldType, value: &FieldValue) -> SchemaResult<()> {
    if declared.accepts(value) {
        Ok(())
    } else {
        Err(SchemaError::FieldTypeMismatch {
            field: field.to_string(),
            expected: declared.name().to_string(),
            found: value.kind().to_string(),
        })
    }
}

struct Walk<'a> {
    registry: Option<&'a SchemaRegistry>,
    path: Vec<Selector>,
    entered: Vec<SchemaHash>,
    visitor: &'a mut dyn FnMut(&[Selector], &FieldType),
}

impl Walk<'_> {
    fn fields(&mut self, fields: &SchemaFields) -> SchemaResult<()> {
        for (name, field_type) in fields.singletons.iter().chain(&fields.collections) {
            self.visit(Selector::field(name.as_str()), field_type)?;
        }
        Ok(())
    }

    fn visit(&mut self, selector: Selector, field_type: &FieldType) -> SchemaResult<()> {
        self.path.push(selector);
        (self.visitor)(&self.path, field_type);
        self.descend(field_type)?;
        self.path.pop();
        Ok(())
    }

    fn descend(&mut self, field_type: &FieldType) -> SchemaResult<()> {
        match field_type {
            FieldType::InlineEntity(inner) => self.fields(inner),
            FieldType::Tuple(components) => {
                for (index, component) in components.iter().enumerate() {
                    self.visit(Selector::tuple_component(index)?, component)?;
                }
                Ok(())
            }
            FieldType::EntityRef(hash) => {
                if self.entered.contains(hash) {
                    return Ok(());
                }
                let target = match self.registry {
                    Some(registry) => registry.get_schema(hash)?,
                    None => None,
                };
                let Some(target) = target else {
                    return Ok(());
                };
                self.entered.push(hash.clone());
                self.fields(&target.fields)?;
                self.entered.pop();
                Ok(())
            }
            FieldType::Text | FieldType::Number | FieldType::Boolean => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arcs_types::Reference;

    use crate::registry::RawEntitySpec;

    fn person_schema() -> Schema {
        Schema::new(
            ["Person"],
            SchemaFields::new()
                .with_singleton("name", FieldType::Text)
                .with_singleton("age", FieldType::Number)
                .with_singleton("hat", FieldType::EntityRef("hat-hash".into()))
                .with_collection("nicknames", FieldType::Text),
            "person-hash",
        )
    }

    fn hat_schema() -> Schema {
        Schema::new(
            ["Hat"],
            SchemaFields::new().with_singleton("style", FieldType::Text),
            "hat-hash",
        )
    }

    fn paths(schema: &Schema, registry: Option<&SchemaRegistry>) -> Vec<String> {
        let mut out = Vec::new();
        schema
            .visit_fields(registry, |selectors, _| {
                let parts: Vec<String> = selectors.iter().map(ToString::to_string).collect();
                out.push(parts.join("."));
            })
            .unwrap();
        out
    }

    #[test]
    fn computed_hash_is_stable_and_shape_sensitive() {
        let fields = SchemaFields::new().with_singleton("name", FieldType::Text);
        let a = Schema::with_computed_hash(["Person"], fields.clone()).unwrap();
        let b = Schema::with_computed_hash(["Person"], fields).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);

        let c = Schema::with_computed_hash(
            ["Person"],
            SchemaFields::new().with_singleton("name", FieldType::Number),
        )
        .unwrap();
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn validate_accepts_declared_fields() {
        let entity = RawEntity::new("e1")
            .with_singleton("name", "Jason")
            .with_singleton("age", 21)
            .with_null("hat")
            .with_collection("nicknames", ["J"]);
        assert!(person_schema().validate_entity(&entity).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_and_mistyped_fields() {
        let schema = person_schema();
        let unknown = RawEntity::new("e1").with_singleton("height", 180);
        assert_eq!(
            schema.validate_entity(&unknown),
            Err(SchemaError::UnknownField {
                schema: "Person".into(),
                field: "height".into()
            })
        );

        let wrong_kind = RawEntity::new("e1").with_collection("name", ["x"]);
        assert!(matches!(
            schema.validate_entity(&wrong_kind),
            Err(SchemaError::UnknownField { .. })
        ));

        let mistyped = RawEntity::new("e1").with_singleton("age", "old");
        assert!(matches!(
            schema.validate_entity(&mistyped),
            Err(SchemaError::FieldTypeMismatch { .. })
        ));

        let hat = RawEntity::new("e1").with_singleton("hat", Reference::new("h", "volatile://a/b"));
        assert!(schema.validate_entity(&hat).is_ok());
    }

    #[test]
    fn field_type_lookup() {
        let schema = person_schema();
        assert_eq!(schema.field_type("name"), Some(&FieldType::Text));
        assert_eq!(schema.field_type("nicknames"), Some(&FieldType::Text));
        assert_eq!(schema.field_type("missing"), None);
    }

    #[test]
    fn visit_without_registry_stays_shallow() {
        assert_eq!(
            paths(&person_schema(), None),
            vec!["age", "hat", "name", "nicknames"]
        );
    }

    #[test]
    fn visit_follows_registered_references() {
        let registry = SchemaRegistry::new();
        registry
            .register(Arc::new(RawEntitySpec::new(hat_schema())))
            .unwrap();
        assert_eq!(
            paths(&person_schema(), Some(&registry)),
            vec!["age", "hat", "hat.style", "name", "nicknames"]
        );
    }

    #[test]
    fn visit_inline_entities_and_tuples() {
        let schema = Schema::new(
            ["Thing"],
            SchemaFields::new()
                .with_singleton(
                    "address",
                    FieldType::InlineEntity(Box::new(
                        SchemaFields::new().with_singleton("city", FieldType::Text),
                    )),
                )
                .with_singleton(
                    "pair",
                    FieldType::Tuple(vec![FieldType::Text, FieldType::Number]),
                ),
            "thing-hash",
        );
        assert_eq!(
            paths(&schema, None),
            vec!["address", "address.city", "pair", "pair.first", "pair.second"]
        );
    }

    #[test]
    fn visit_terminates_on_cycles() {
        let node = Schema::new(
            ["Node"],
            SchemaFields::new()
                .with_singleton("label", FieldType::Text)
                .with_singleton("next", FieldType::EntityRef("node-hash".into())),
            "node-hash",
        );
        let registry = SchemaRegistry::new();
        registry
            .register(Arc::new(RawEntitySpec::new(node.clone())))
            .unwrap();
        assert_eq!(paths(&node, Some(&registry)), vec!["label", "next"]);
    }

    #[test]
    fn oversized_tuple_fails_traversal() {
        let schema = Schema::new(
            ["Wide"],
            SchemaFields::new().with_singleton("t", FieldType::Tuple(vec![FieldType::Text; 6])),
            "wide",
        );
        assert!(matches!(
            schema.visit_fields(None, |_, _| {}),
            Err(SchemaError::TupleIndexOutOfRange { index: 5, .. })
        ));
    }
}
