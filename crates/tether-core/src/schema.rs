//! # Schema Collaborators
//!
//! The cache never defines entities itself. It asks two collaborators:
//! - `Schema`: which relationships a type declares, their cardinality, and
//!   which relationship on the other type is the inverse.
//! - `Residency`: whether a materialized record currently exists for an
//!   entity.
//!
//! `StaticSchema` is the in-memory `Schema` built from a serde
//! `SchemaDefinition`; every inverse is resolved and cross-checked at
//! construction so that lookups during a flush cannot fail.
//! `RecordSet` is the in-memory `Residency`.

use crate::{Cardinality, Reference, TetherError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Metadata for one declared relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipMeta {
    /// Relationship name on the declaring type.
    pub name: String,
    /// Cardinality of this side.
    pub kind: Cardinality,
    /// Type name of the related entity.
    pub target: String,
}

/// The other side of a relationship pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct InverseRef {
    /// Type declaring the inverse.
    pub type_name: String,
    /// Relationship name of the inverse.
    pub relationship: String,
}

/// Schema reflection consumed by the cache.
pub trait Schema {
    /// Names of every relationship declared on `type_name`, in name order.
    /// Unknown types declare nothing.
    fn relationship_names(&self, type_name: &str) -> Vec<String>;

    /// Metadata for one relationship, or `None` if undeclared.
    fn relationship(&self, type_name: &str, name: &str) -> Option<&RelationshipMeta>;

    /// The inverse of a relationship, or `None` when it has none.
    fn inverse_for(&self, type_name: &str, name: &str) -> Option<InverseRef>;
}

/// Answers whether a materialized record exists for an entity.
pub trait Residency {
    /// `true` iff a record for `reference` is currently materialized.
    fn is_resident(&self, reference: &Reference) -> bool;
}

// =============================================================================
// SCHEMA DEFINITION (serde)
// =============================================================================

/// Declaration of one relationship, as written in a schema file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelationshipDefinition {
    /// `belongs-to` or `has-many`.
    pub kind: Cardinality,
    /// Related type name.
    pub target: String,
    /// Explicit inverse relationship name on `target`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
    /// Declares that this relationship has no inverse.
    #[serde(default)]
    pub no_inverse: bool,
}

impl RelationshipDefinition {
    /// A to-one relationship pointing at `target`.
    #[must_use]
    pub fn belongs_to(target: impl Into<String>) -> Self {
        Self {
            kind: Cardinality::BelongsTo,
            target: target.into(),
            inverse: None,
            no_inverse: false,
        }
    }

    /// A to-many relationship pointing at `target`.
    #[must_use]
    pub fn has_many(target: impl Into<String>) -> Self {
        Self {
            kind: Cardinality::HasMany,
            target: target.into(),
            inverse: None,
            no_inverse: false,
        }
    }

    /// Name the inverse explicitly.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Declare that there is no inverse.
    #[must_use]
    pub fn without_inverse(mut self) -> Self {
        self.no_inverse = true;
        self
    }
}

/// Declaration of one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct TypeDefinition {
    /// Relationships keyed by name.
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipDefinition>,
}

/// A complete schema document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct SchemaDefinition {
    /// Types keyed by name.
    #[serde(default)]
    pub types: BTreeMap<String, TypeDefinition>,
}

impl SchemaDefinition {
    /// Create an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a type with no relationships (no-op if already declared).
    #[must_use]
    pub fn entity(mut self, type_name: impl Into<String>) -> Self {
        self.types.entry(type_name.into()).or_default();
        self
    }

    /// Declare a relationship on `type_name`, declaring the type if needed.
    #[must_use]
    pub fn relationship(
        mut self,
        type_name: impl Into<String>,
        name: impl Into<String>,
        definition: RelationshipDefinition,
    ) -> Self {
        self.types
            .entry(type_name.into())
            .or_default()
            .relationships
            .insert(name.into(), definition);
        self
    }
}

// =============================================================================
// STATIC SCHEMA
// =============================================================================

/// A validated, immutable schema with every inverse pre-resolved.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    relationships: BTreeMap<String, BTreeMap<String, RelationshipMeta>>,
    inverses: BTreeMap<(String, String), InverseRef>,
}

impl StaticSchema {
    /// Validate a definition and resolve all inverses.
    pub fn from_definition(definition: &SchemaDefinition) -> Result<Self, TetherError> {
        let mut relationships = BTreeMap::new();

        for (type_name, type_def) in &definition.types {
            let mut declared = BTreeMap::new();
            for (name, rel) in &type_def.relationships {
                if !definition.types.contains_key(&rel.target) {
                    return Err(TetherError::UnknownType(rel.target.clone()));
                }
                if rel.no_inverse && rel.inverse.is_some() {
                    return Err(TetherError::InvalidSchema(format!(
                        "{type_name}:{name} declares both an inverse and no_inverse"
                    )));
                }
                declared.insert(
                    name.clone(),
                    RelationshipMeta {
                        name: name.clone(),
                        kind: rel.kind,
                        target: rel.target.clone(),
                    },
                );
            }
            relationships.insert(type_name.clone(), declared);
        }

        let mut inverses = BTreeMap::new();
        for (type_name, type_def) in &definition.types {
            for (name, rel) in &type_def.relationships {
                if let Some(inverse) = resolve_inverse(definition, type_name, name, rel)? {
                    inverses.insert((type_name.clone(), name.clone()), inverse);
                }
            }
        }

        for ((type_name, name), inverse) in &inverses {
            let back = inverses.get(&(inverse.type_name.clone(), inverse.relationship.clone()));
            let mutual = back.is_some_and(|b| &b.type_name == type_name && &b.relationship == name);
            if !mutual {
                return Err(TetherError::InverseMismatch(
                    format!("{type_name}:{name}"),
                    format!("{}:{}", inverse.type_name, inverse.relationship),
                ));
            }
        }

        Ok(Self {
            relationships,
            inverses,
        })
    }

    /// All declared type names.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.relationships.keys().map(String::as_str)
    }

    /// Every declared `(type, relationship)` together with its inverse.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &RelationshipMeta, Option<&InverseRef>)> {
        self.relationships.iter().flat_map(move |(type_name, rels)| {
            rels.values().map(move |meta| {
                let inverse = self.inverses.get(&(type_name.clone(), meta.name.clone()));
                (type_name.as_str(), meta, inverse)
            })
        })
    }
}

/// Find the inverse for one relationship.
///
/// Candidates on the target type are relationships pointing back at the
/// declaring type whose own `inverse` option is unset or names this
/// relationship.
fn resolve_inverse(
    definition: &SchemaDefinition,
    type_name: &str,
    name: &str,
    rel: &RelationshipDefinition,
) -> Result<Option<InverseRef>, TetherError> {
    if rel.no_inverse {
        return Ok(None);
    }

    let target_rels = definition
        .types
        .get(&rel.target)
        .map(|t| &t.relationships)
        .ok_or_else(|| TetherError::UnknownType(rel.target.clone()))?;

    if let Some(inverse) = &rel.inverse {
        let Some(candidate) = target_rels.get(inverse) else {
            return Err(TetherError::UnknownInverse {
                type_name: type_name.to_string(),
                relationship: name.to_string(),
                inverse: inverse.clone(),
            });
        };
        if candidate.target != type_name {
            return Err(TetherError::InverseTargetMismatch {
                type_name: type_name.to_string(),
                relationship: name.to_string(),
                inverse: inverse.clone(),
            });
        }
        return Ok(Some(InverseRef {
            type_name: rel.target.clone(),
            relationship: inverse.clone(),
        }));
    }

    let candidates: Vec<&String> = target_rels
        .iter()
        .filter(|(_, candidate)| candidate.target == type_name && !candidate.no_inverse)
        .filter(|(_, candidate)| candidate.inverse.as_deref().is_none_or(|inv| inv == name))
        .map(|(candidate_name, _)| candidate_name)
        .collect();

    match candidates.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(InverseRef {
            type_name: rel.target.clone(),
            relationship: (*only).clone(),
        })),
        many => Err(TetherError::AmbiguousInverse {
            type_name: type_name.to_string(),
            relationship: name.to_string(),
            candidates: many.iter().map(|c| (*c).clone()).collect(),
        }),
    }
}

impl Schema for StaticSchema {
    fn relationship_names(&self, type_name: &str) -> Vec<String> {
        self.relationships
            .get(type_name)
            .map(|rels| rels.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn relationship(&self, type_name: &str, name: &str) -> Option<&RelationshipMeta> {
        self.relationships.get(type_name)?.get(name)
    }

    fn inverse_for(&self, type_name: &str, name: &str) -> Option<InverseRef> {
        self.inverses
            .get(&(type_name.to_string(), name.to_string()))
            .cloned()
    }
}

// =============================================================================
// RECORD SET
// =============================================================================

/// The set of entities that currently have a materialized record.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: BTreeSet<Reference>,
}

impl RecordSet {
    /// Create an empty record set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an entity as materialized. Incomplete references are ignored.
    pub fn materialize(&mut self, reference: Reference) -> bool {
        if !reference.is_complete() {
            return false;
        }
        self.records.insert(reference)
    }

    /// Drop an entity's record. Returns whether it was present.
    pub fn evict(&mut self, reference: &Reference) -> bool {
        self.records.remove(reference)
    }

    /// Number of materialized records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Residency for RecordSet {
    fn is_resident(&self, reference: &Reference) -> bool {
        reference.is_complete() && self.records.contains(reference)
    }
}

// =============================================================================
// TESTS
// =============================================================================
