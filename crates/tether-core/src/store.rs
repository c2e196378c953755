//! # Store
//!
//! The owner of one relationship cache.
//!
//! A `Store` ties together the three collaborators the cache needs:
//! - the schema (`Schema`), immutable for the store's lifetime
//! - the materialized-record set (`RecordSet`), answering residency
//! - the `PayloadRegistry`, constructed here and dropped with the store
//!
//! Nothing is global: two stores never share ledgers.

use crate::ledger::LedgerSnapshot;
use crate::registry::PayloadRegistry;
use crate::schema::{RecordSet, Residency, Schema};
use crate::{PayloadEntry, Reference, RelationshipFragments};

/// A store instance owning its relationship payload cache.
#[derive(Debug, Clone)]
pub struct Store<S: Schema> {
    schema: S,
    records: RecordSet,
    payloads: PayloadRegistry,
}

impl<S: Schema> Store<S> {
    /// Create an empty store over `schema`.
    #[must_use]
    pub fn new(schema: S) -> Self {
        Self {
            schema,
            records: RecordSet::new(),
            payloads: PayloadRegistry::new(),
        }
    }

    /// The schema this store was built with.
    #[must_use]
    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// The materialized-record set.
    #[must_use]
    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    /// The relationship payload registry.
    #[must_use]
    pub fn payloads(&self) -> &PayloadRegistry {
        &self.payloads
    }

    /// Ingest the relationship section of a received resource.
    pub fn push(&mut self, type_name: &str, id: &str, fragments: RelationshipFragments) {
        self.payloads.push(&self.schema, type_name, id, fragments);
    }

    /// Reconciled state for one entity's relationship.
    pub fn get(&mut self, type_name: &str, id: &str, relationship: &str) -> Option<&PayloadEntry> {
        self.payloads.get(&self.schema, type_name, id, relationship)
    }

    /// Mark an entity as having a materialized record.
    pub fn materialize(&mut self, type_name: &str, id: &str) -> bool {
        self.records.materialize(Reference::new(type_name, id))
    }

    /// Whether an entity has a materialized record.
    #[must_use]
    pub fn is_resident(&self, type_name: &str, id: &str) -> bool {
        self.records.is_resident(&Reference::new(type_name, id))
    }

    /// Evict an entity's record and its cached relationship payloads.
    pub fn unload(&mut self, type_name: &str, id: &str) {
        self.records.evict(&Reference::new(type_name, id));
        self.payloads
            .unload(&self.schema, &self.records, type_name, id);
    }

    /// Flush every ledger and capture the whole cache.
    pub fn snapshot(&mut self) -> Vec<LedgerSnapshot> {
        self.payloads.snapshot(&self.schema)
    }
}
