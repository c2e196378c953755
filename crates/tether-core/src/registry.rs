//! # Payload Registry
//!
//! Per-store map from relationship pair to its `RelationshipLedger`.
//!
//! Both sides of a pair hash to the same canonical key, so a push from
//! either side and a read from either side meet in one ledger. Schema and
//! inverse metadata are resolved once per `type:relationship` and memoized.

use crate::ledger::{LedgerSnapshot, RelationshipLedger, SideKey};
use crate::primitives::{canonical_pair_key, side_key};
use crate::schema::{Residency, Schema};
use crate::{PayloadEntry, RelationshipFragments};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Resolved metadata for one relationship, seen from its declaring side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipInfo {
    /// The declaring side.
    pub lhs: SideKey,
    /// The inverse side, unset when there is no inverse.
    pub rhs: SideKey,
    /// Canonical key shared by both sides.
    pub pair_key: String,
    /// Whether an inverse exists.
    pub has_inverse: bool,
    /// Both sides live on the same type.
    pub is_self_referential: bool,
    /// Both sides are the same relationship.
    pub is_reflexive: bool,
}

impl RelationshipInfo {
    fn resolve<S: Schema + ?Sized>(
        schema: &S,
        type_name: &str,
        relationship: &str,
    ) -> Option<Self> {
        schema.relationship(type_name, relationship)?;

        let lhs = SideKey::new(type_name, relationship);
        let rhs = schema
            .inverse_for(type_name, relationship)
            .map_or_else(SideKey::unset, |inverse| {
                SideKey::new(inverse.type_name, inverse.relationship)
            });
        let has_inverse = !rhs.is_unset();

        Some(Self {
            pair_key: canonical_pair_key(&lhs.key(), &rhs.key()),
            has_inverse,
            is_self_referential: has_inverse && lhs.type_name == rhs.type_name,
            is_reflexive: lhs == rhs,
            lhs,
            rhs,
        })
    }
}

/// Registry of relationship ledgers for one store.
#[derive(Debug, Clone, Default)]
pub struct PayloadRegistry {
    /// `type:relationship` -> resolved info. Undeclared names are never stored.
    info: BTreeMap<String, RelationshipInfo>,
    /// Canonical pair key -> ledger.
    ledgers: BTreeMap<String, RelationshipLedger>,
}

impl PayloadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve (and memoize) metadata for one declared relationship.
    pub fn relationship_info<S: Schema + ?Sized>(
        &mut self,
        schema: &S,
        type_name: &str,
        relationship: &str,
    ) -> Option<RelationshipInfo> {
        let key = side_key(type_name, relationship);
        if let Some(info) = self.info.get(&key) {
            return Some(info.clone());
        }
        let info = RelationshipInfo::resolve(schema, type_name, relationship)?;
        self.info.insert(key, info.clone());
        Some(info)
    }

    /// Number of memoized relationship resolutions.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.info.len()
    }

    /// Find the ledger for a relationship, creating it when `create` is set.
    ///
    /// Undeclared relationships never get a ledger.
    pub fn ledger_for<S: Schema + ?Sized>(
        &mut self,
        schema: &S,
        type_name: &str,
        relationship: &str,
        create: bool,
    ) -> Option<&mut RelationshipLedger> {
        let info = self.relationship_info(schema, type_name, relationship)?;
        if !create {
            return self.ledgers.get_mut(&info.pair_key);
        }
        Some(self.ledgers.entry(info.pair_key).or_insert_with_key(|pair| {
            debug!(pair = %pair, reflexive = info.is_reflexive, "creating relationship ledger");
            RelationshipLedger::new(info.lhs, info.rhs)
        }))
    }

    /// Current reconciled state of one entity's relationship.
    ///
    /// Returns `None` for undeclared relationships and for pairs nothing has
    /// been pushed to yet.
    pub fn get<S: Schema + ?Sized>(
        &mut self,
        schema: &S,
        type_name: &str,
        id: &str,
        relationship: &str,
    ) -> Option<&PayloadEntry> {
        self.ledger_for(schema, type_name, relationship, false)?
            .get(type_name, id, relationship, schema)
    }

    /// Queue every present fragment of a resource's relationship section.
    ///
    /// Names the schema does not declare are dropped.
    pub fn push<S: Schema + ?Sized>(
        &mut self,
        schema: &S,
        type_name: &str,
        id: &str,
        fragments: RelationshipFragments,
    ) {
        for (relationship, fragment) in fragments {
            match self.ledger_for(schema, type_name, &relationship, true) {
                Some(ledger) => ledger.push(type_name, id, &relationship, fragment),
                None => debug!(
                    type_name,
                    id,
                    relationship = %relationship,
                    "dropping payload for undeclared relationship"
                ),
            }
        }
    }

    /// Unload cached payloads for every relationship declared on `type_name`.
    pub fn unload<S, R>(&mut self, schema: &S, residency: &R, type_name: &str, id: &str)
    where
        S: Schema + ?Sized,
        R: Residency + ?Sized,
    {
        for relationship in schema.relationship_names(type_name) {
            if let Some(ledger) = self.ledger_for(schema, type_name, &relationship, false) {
                ledger.unload(type_name, id, &relationship, schema, residency);
            }
        }
    }

    /// Flush every ledger.
    pub fn flush_all<S: Schema + ?Sized>(&mut self, schema: &S) {
        for ledger in self.ledgers.values_mut() {
            ledger.flush(schema);
        }
    }

    /// Number of ledgers created so far.
    #[must_use]
    pub fn ledger_count(&self) -> usize {
        self.ledgers.len()
    }

    /// Ledgers in canonical key order.
    pub fn ledgers(&self) -> impl Iterator<Item = (&str, &RelationshipLedger)> {
        self.ledgers.iter().map(|(key, ledger)| (key.as_str(), ledger))
    }

    /// Flush every ledger and capture its state.
    pub fn snapshot<S: Schema + ?Sized>(&mut self, schema: &S) -> Vec<LedgerSnapshot> {
        self.ledgers
            .values_mut()
            .map(|ledger| ledger.snapshot(schema))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
