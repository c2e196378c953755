//! # Core Type Definitions
//!
//! This module contains all core types for the tether relationship cache:
//! - Entity pointers (`Reference`)
//! - Normalized relationship shapes (`PayloadData`, `PayloadEntry`, `Cardinality`)
//! - Wire fragments as received from the adapter layer
//!   (`RelationshipFragment`, `RawLinkage`, `ResourceIdentifier`)
//! - Error types (`TetherError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Implement `Ord` where they are used as map keys
//! - Serialize to the conventional resource-relationship document shape

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// REFERENCE
// =============================================================================

/// A pointer to one entity by `(type, id)`.
///
/// A Reference never owns the entity it names; it is only a key into
/// whatever materialization layer sits above the cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Reference {
    /// The entity type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// The entity id.
    pub id: String,
}

impl Reference {
    /// Create a new reference.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// A reference is complete when both its type and id are non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.type_name.is_empty() && !self.id.is_empty()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.id)
    }
}

// =============================================================================
// CARDINALITY
// =============================================================================

/// Declared kind of one side of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    /// At most one related entity (`belongs-to`).
    #[serde(alias = "to-one")]
    BelongsTo,
    /// An ordered list of related entities (`has-many`).
    #[serde(alias = "to-many")]
    HasMany,
}

impl Cardinality {
    /// Whether this side holds a list.
    #[must_use]
    pub const fn is_many(self) -> bool {
        matches!(self, Self::HasMany)
    }
}

// =============================================================================
// PAYLOAD DATA
// =============================================================================

/// The normalized shape of what a relationship currently points to.
///
/// A to-one side only ever holds `Empty` or `Single`; a to-many side only
/// ever holds `List` (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadData {
    /// Explicitly nothing (`data: null`).
    Empty,
    /// Exactly one related entity.
    Single(Reference),
    /// An ordered list of related entities.
    List(Vec<Reference>),
}

impl PayloadData {
    /// Iterate over every reference held, in order.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        let slice: &[Reference] = match self {
            Self::Empty => &[],
            Self::Single(reference) => std::slice::from_ref(reference),
            Self::List(references) => references,
        };
        slice.iter()
    }

    /// Whether the given reference is held.
    #[must_use]
    pub fn contains(&self, reference: &Reference) -> bool {
        self.references().any(|r| r == reference)
    }

    /// Number of references held.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(_) => 1,
            Self::List(references) => references.len(),
        }
    }

    /// Whether no reference is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coerce raw linkage into the shape required by `cardinality`.
    ///
    /// Identifiers lacking a type or an id are dropped. A list arriving on a
    /// to-one side keeps only its first complete identifier.
    #[must_use]
    pub fn normalize(raw: &RawLinkage, cardinality: Cardinality) -> Self {
        let references: Vec<Reference> = match raw {
            RawLinkage::Null => Vec::new(),
            RawLinkage::One(identifier) => identifier.to_reference().into_iter().collect(),
            RawLinkage::Many(identifiers) => identifiers
                .iter()
                .filter_map(ResourceIdentifier::to_reference)
                .collect(),
        };

        match cardinality {
            Cardinality::HasMany => Self::List(references),
            Cardinality::BelongsTo => {
                if references.len() > 1 {
                    tracing::warn!(
                        received = references.len(),
                        "list pushed to a belongs-to relationship; keeping the first reference"
                    );
                }
                references
                    .into_iter()
                    .next()
                    .map_or(Self::Empty, Self::Single)
            }
        }
    }
}

// =============================================================================
// PAYLOAD ENTRY
// =============================================================================

/// One cached relationship state for one entity.
///
/// `is_inverse_derived == false` means the entry is exactly what was last
/// pushed directly for this (entity, relationship). `true` means the entry
/// was synthesized or altered because the other side referenced this entity.
/// Links and meta on a derived entry, if any, survive from an earlier direct
/// push and are not authoritative.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayloadEntry {
    /// The current linkage.
    pub data: PayloadData,
    /// Provenance of `data`.
    #[serde(rename = "isInverseDerived")]
    pub is_inverse_derived: bool,
    /// Links object from the last direct push, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<JsonValue>,
    /// Meta object from the last direct push, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<JsonValue>,
}

impl PayloadEntry {
    /// An entry built from a direct push.
    #[must_use]
    pub fn pushed(data: PayloadData) -> Self {
        Self {
            data,
            is_inverse_derived: false,
            links: None,
            meta: None,
        }
    }

    /// An entry synthesized from the other side of the relationship.
    #[must_use]
    pub fn derived(data: PayloadData) -> Self {
        Self {
            data,
            is_inverse_derived: true,
            links: None,
            meta: None,
        }
    }
}

// =============================================================================
// WIRE FRAGMENTS
// =============================================================================

/// An entity id as it appears on the wire: either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    /// `"id": "42"`
    Text(String),
    /// `"id": 42`
    Integer(i64),
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
        }
    }
}

/// A resource identifier object: `{ "type": ..., "id": ... }`.
///
/// Both members are optional on the wire; incomplete identifiers are
/// tolerated and excluded from all bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ResourceIdentifier {
    /// Entity id.
    #[serde(default)]
    pub id: Option<IdValue>,
    /// Entity type name.
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
}

impl ResourceIdentifier {
    /// Build a complete identifier.
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: Some(IdValue::Text(id.into())),
            type_name: Some(type_name.into()),
        }
    }

    /// Convert into a `Reference`, or `None` when type or id is missing.
    #[must_use]
    pub fn to_reference(&self) -> Option<Reference> {
        let type_name = self.type_name.as_deref().filter(|t| !t.is_empty())?;
        let id = self.id.as_ref()?.to_string();
        if id.is_empty() {
            tracing::debug!(type_name, "dropping identifier with empty id");
            return None;
        }
        Some(Reference::new(type_name, id))
    }
}

/// The `data` member of a relationship fragment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawLinkage {
    /// `"data": null`
    Null,
    /// `"data": { "type": ..., "id": ... }`
    One(ResourceIdentifier),
    /// `"data": [ ... ]`
    Many(Vec<ResourceIdentifier>),
}

/// One relationship's section of a resource payload.
///
/// `data: None` means the member was absent, which is distinct from
/// `data: Some(RawLinkage::Null)`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RelationshipFragment {
    /// Linkage, if the member was present.
    #[serde(default, deserialize_with = "present")]
    pub data: Option<RawLinkage>,
    /// Links object.
    #[serde(default)]
    pub links: Option<JsonValue>,
    /// Meta object.
    #[serde(default)]
    pub meta: Option<JsonValue>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<RawLinkage>, D::Error>
where
    D: Deserializer<'de>,
{
    RawLinkage::deserialize(deserializer).map(Some)
}

impl RelationshipFragment {
    /// Fragment with `data: null`.
    #[must_use]
    pub fn null() -> Self {
        Self::with_data(RawLinkage::Null)
    }

    /// Fragment pointing at exactly one entity.
    #[must_use]
    pub fn one(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::with_data(RawLinkage::One(ResourceIdentifier::new(type_name, id)))
    }

    /// Fragment pointing at a list of entities.
    #[must_use]
    pub fn many<T, I>(type_name: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::with_data(RawLinkage::Many(
            ids.into_iter()
                .map(|id| ResourceIdentifier::new(type_name, id))
                .collect(),
        ))
    }

    /// Fragment with the given linkage and no links or meta.
    #[must_use]
    pub fn with_data(data: RawLinkage) -> Self {
        Self {
            data: Some(data),
            links: None,
            meta: None,
        }
    }
}

/// A resource's relationship section, keyed by relationship name.
pub type RelationshipFragments = BTreeMap<String, RelationshipFragment>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the tether system.
///
/// Schema and configuration problems are reported here, at construction
/// time. Cache operations themselves never fail.
#[derive(Debug, Error)]
pub enum TetherError {
    /// A relationship targets a type the schema does not declare.
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// A relationship name is not declared on a type.
    #[error("Unknown relationship: {0}:{1}")]
    UnknownRelationship(String, String),

    /// An explicit inverse names a relationship the target does not declare.
    #[error("Unknown inverse {inverse} for {type_name}:{relationship}")]
    UnknownInverse {
        /// Declaring type.
        type_name: String,
        /// Declaring relationship.
        relationship: String,
        /// The missing inverse name.
        inverse: String,
    },

    /// An explicit inverse exists but does not point back at the source type.
    #[error("Inverse {inverse} of {type_name}:{relationship} does not target {type_name}")]
    InverseTargetMismatch {
        /// Declaring type.
        type_name: String,
        /// Declaring relationship.
        relationship: String,
        /// The named inverse.
        inverse: String,
    },

    /// More than one relationship could be the inverse.
    #[error("Ambiguous inverse for {type_name}:{relationship}: candidates {candidates:?}")]
    AmbiguousInverse {
        /// Declaring type.
        type_name: String,
        /// Declaring relationship.
        relationship: String,
        /// Every matching candidate name.
        candidates: Vec<String>,
    },

    /// Two relationships disagree about being each other's inverse.
    #[error("Inverse mismatch: {0} resolves to {1}, which does not resolve back")]
    InverseMismatch(String, String),

    /// The schema definition is structurally invalid.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
