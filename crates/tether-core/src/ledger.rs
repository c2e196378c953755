//! # Relationship Ledger
//!
//! The bidirectional payload cache for exactly one relationship pair.
//!
//! A ledger holds one id-keyed entry map per side and a FIFO queue of
//! pushes not yet applied. Pushes are O(1) appends; every read or unload
//! first drains the queue, so no caller ever observes a half-applied batch.
//!
//! Applying one push is a full strike-then-rebuild:
//! 1. every reference the owner previously held loses its back-reference,
//! 2. the owner's entry is replaced,
//! 3. every reference the owner now holds gains a back-reference.
//!
//! When the pair is reflexive (same type and same relationship name on both
//! sides) both sides are literally the same map.

use crate::primitives::{canonical_pair_key, side_key};
use crate::schema::{Residency, Schema};
use crate::{Cardinality, PayloadData, PayloadEntry, Reference, RelationshipFragment};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

// =============================================================================
// SIDES
// =============================================================================

/// One of the two sides of a relationship pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    /// The side the ledger was created from.
    Lhs,
    /// The inverse side.
    Rhs,
}

impl Side {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Lhs => Self::Rhs,
            Self::Rhs => Self::Lhs,
        }
    }
}

/// Identifies one relationship side by `(type, relationship name)`.
///
/// A side with an empty type stands for "no inverse" and never matches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SideKey {
    /// Declaring type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Relationship name on that type.
    pub relationship: String,
}

impl SideKey {
    /// Create a side key.
    #[must_use]
    pub fn new(type_name: impl Into<String>, relationship: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            relationship: relationship.into(),
        }
    }

    /// The "no inverse" staging side.
    #[must_use]
    pub fn unset() -> Self {
        Self::default()
    }

    /// Whether this is the "no inverse" staging side.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.type_name.is_empty()
    }

    /// Whether `(type_name, relationship)` names this side.
    #[must_use]
    pub fn matches(&self, type_name: &str, relationship: &str) -> bool {
        !self.is_unset() && self.type_name == type_name && self.relationship == relationship
    }

    /// The `"type:relationship"` form.
    #[must_use]
    pub fn key(&self) -> String {
        side_key(&self.type_name, &self.relationship)
    }
}

// =============================================================================
// PENDING QUEUE
// =============================================================================

#[derive(Debug, Clone)]
struct PendingPush {
    type_name: String,
    id: String,
    relationship: String,
    fragment: RelationshipFragment,
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A serializable view of one flushed ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSnapshot {
    /// Canonical pair key.
    pub pair: String,
    /// Left-hand side.
    pub lhs: SideKey,
    /// Right-hand side (unset when there is no inverse).
    pub rhs: SideKey,
    /// Whether both sides share one map.
    pub reflexive: bool,
    /// Entries on the left-hand side.
    pub lhs_entries: BTreeMap<String, PayloadEntry>,
    /// Entries on the right-hand side; absent when reflexive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rhs_entries: Option<BTreeMap<String, PayloadEntry>>,
}

// =============================================================================
// LEDGER
// =============================================================================

/// Bidirectional payload cache for one relationship pair.
#[derive(Debug, Clone)]
pub struct RelationshipLedger {
    lhs: SideKey,
    rhs: SideKey,
    is_reflexive: bool,
    /// One map per side, or a single shared map when reflexive.
    payloads: Vec<BTreeMap<String, PayloadEntry>>,
    pending: VecDeque<PendingPush>,
    /// `None` until first resolved; schema is immutable afterwards.
    lhs_kind: Option<Cardinality>,
    rhs_kind: Option<Cardinality>,
}

impl RelationshipLedger {
    /// Create an empty ledger for the pair `lhs` / `rhs`.
    #[must_use]
    pub fn new(lhs: SideKey, rhs: SideKey) -> Self {
        let is_reflexive = lhs == rhs;
        let maps = if is_reflexive { 1 } else { 2 };
        Self {
            lhs,
            rhs,
            is_reflexive,
            payloads: vec![BTreeMap::new(); maps],
            pending: VecDeque::new(),
            lhs_kind: None,
            rhs_kind: None,
        }
    }

    /// The left-hand side.
    #[must_use]
    pub fn lhs(&self) -> &SideKey {
        &self.lhs
    }

    /// The right-hand side.
    #[must_use]
    pub fn rhs(&self) -> &SideKey {
        &self.rhs
    }

    /// Whether both sides are the same relationship.
    #[must_use]
    pub fn is_reflexive(&self) -> bool {
        self.is_reflexive
    }

    /// Whether the right-hand side is a real relationship.
    #[must_use]
    pub fn has_inverse(&self) -> bool {
        !self.rhs.is_unset()
    }

    /// Canonical pair key of this ledger.
    #[must_use]
    pub fn pair_key(&self) -> String {
        canonical_pair_key(&self.lhs.key(), &self.rhs.key())
    }

    /// Number of pushes waiting for the next flush.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Which side `(type_name, relationship)` names, if any.
    #[must_use]
    pub fn side_of(&self, type_name: &str, relationship: &str) -> Option<Side> {
        if self.lhs.matches(type_name, relationship) {
            Some(Side::Lhs)
        } else if self.rhs.matches(type_name, relationship) {
            Some(Side::Rhs)
        } else {
            None
        }
    }

    /// Entries on one side as of the last flush.
    #[must_use]
    pub fn entries(&self, side: Side) -> &BTreeMap<String, PayloadEntry> {
        &self.payloads[self.slot(side)]
    }

    /// Queue a push. Never touches the entry maps.
    pub fn push(
        &mut self,
        type_name: &str,
        id: &str,
        relationship: &str,
        fragment: RelationshipFragment,
    ) {
        self.pending.push_back(PendingPush {
            type_name: type_name.to_string(),
            id: id.to_string(),
            relationship: relationship.to_string(),
            fragment,
        });
    }

    /// Flush, then return the entry for `id` on the side named by
    /// `(type_name, relationship)`.
    pub fn get<S: Schema + ?Sized>(
        &mut self,
        type_name: &str,
        id: &str,
        relationship: &str,
        schema: &S,
    ) -> Option<&PayloadEntry> {
        self.flush(schema);
        let side = self.side_of(type_name, relationship)?;
        self.entries(side).get(id)
    }

    /// Flush, then drop the entry for `id` unless one of the entities it
    /// references has a materialized record.
    ///
    /// Dropping an entry also strikes `id` out of every referenced entity's
    /// entry on the other side.
    pub fn unload<S, R>(
        &mut self,
        type_name: &str,
        id: &str,
        relationship: &str,
        schema: &S,
        residency: &R,
    ) where
        S: Schema + ?Sized,
        R: Residency + ?Sized,
    {
        self.flush(schema);
        let Some(own) = self.side_of(type_name, relationship) else {
            return;
        };
        let Some(entry) = self.entries(own).get(id) else {
            return;
        };

        let targets: Vec<Reference> = entry.data.references().cloned().collect();
        if let Some(resident) = targets.iter().find(|t| residency.is_resident(t)) {
            debug!(
                owner = %Reference::new(type_name, id),
                relationship,
                resident = %resident,
                "inverse record is resident; retaining cached payload"
            );
            return;
        }

        let slot = self.slot(own);
        self.payloads[slot].remove(id);

        let owner = Reference::new(type_name, id);
        for target in &targets {
            if self.is_reflexive && target.id == owner.id {
                continue;
            }
            self.remove_from_inverse(own.opposite(), &target.id, &owner);
        }
    }

    /// Apply every pending push in arrival order.
    pub fn flush<S: Schema + ?Sized>(&mut self, schema: &S) {
        if self.pending.is_empty() {
            return;
        }
        let count = self.pending.len();
        while let Some(push) = self.pending.pop_front() {
            self.apply(push, schema);
        }
        debug!(pair = %self.pair_key(), count, "flushed pending pushes");
    }

    /// Flush, then capture every entry.
    pub fn snapshot<S: Schema + ?Sized>(&mut self, schema: &S) -> LedgerSnapshot {
        self.flush(schema);
        LedgerSnapshot {
            pair: self.pair_key(),
            lhs: self.lhs.clone(),
            rhs: self.rhs.clone(),
            reflexive: self.is_reflexive,
            lhs_entries: self.entries(Side::Lhs).clone(),
            rhs_entries: (!self.is_reflexive).then(|| self.entries(Side::Rhs).clone()),
        }
    }

    // -------------------------------------------------------------------------
    // internals
    // -------------------------------------------------------------------------

    fn slot(&self, side: Side) -> usize {
        match (self.is_reflexive, side) {
            (true, _) | (false, Side::Lhs) => 0,
            (false, Side::Rhs) => 1,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<String, PayloadEntry> {
        let slot = self.slot(side);
        &mut self.payloads[slot]
    }

    /// Resolve a side's cardinality once, then reuse it.
    ///
    /// The unset staging side behaves as `belongs-to`.
    fn cardinality<S: Schema + ?Sized>(&mut self, side: Side, schema: &S) -> Cardinality {
        let (key, cached) = match side {
            Side::Lhs => (&self.lhs, &mut self.lhs_kind),
            Side::Rhs => (&self.rhs, &mut self.rhs_kind),
        };
        *cached.get_or_insert_with(|| {
            schema
                .relationship(&key.type_name, &key.relationship)
                .map_or(Cardinality::BelongsTo, |meta| meta.kind)
        })
    }

    fn apply<S: Schema + ?Sized>(&mut self, push: PendingPush, schema: &S) {
        let Some(own) = self.side_of(&push.type_name, &push.relationship) else {
            debug!(
                pair = %self.pair_key(),
                type_name = %push.type_name,
                relationship = %push.relationship,
                "push does not belong to this ledger; skipping"
            );
            return;
        };
        let other = own.opposite();
        let own_kind = self.cardinality(own, schema);
        let other_kind = self.cardinality(other, schema);
        let owner = Reference::new(push.type_name, push.id);
        let RelationshipFragment { data, links, meta } = push.fragment;

        let Some(raw) = data else {
            // links/meta only: linkage is untouched, and unknown linkage is
            // never cached
            let Some(entry) = self.side_mut(own).get_mut(&owner.id) else {
                debug!(
                    owner = %owner,
                    relationship = %push.relationship,
                    "no linkage known; links/meta not cached"
                );
                return;
            };
            if links.is_some() {
                entry.links = links;
            }
            if meta.is_some() {
                entry.meta = meta;
            }
            return;
        };

        let data = PayloadData::normalize(&raw, own_kind);

        let previous: Vec<Reference> = self
            .entries(own)
            .get(&owner.id)
            .map(|entry| entry.data.references().cloned().collect())
            .unwrap_or_default();
        for target in &previous {
            self.remove_from_inverse(other, &target.id, &owner);
        }

        let added: Vec<Reference> = data.references().cloned().collect();
        self.side_mut(own).insert(
            owner.id.clone(),
            PayloadEntry {
                data,
                is_inverse_derived: false,
                links,
                meta,
            },
        );

        for target in &added {
            if self.is_reflexive && target.id == owner.id {
                continue;
            }
            self.add_to_inverse(other, other_kind, &target.id, &owner);
        }
    }

    /// Remove `owner` from the entry at `target_id` on `side`.
    fn remove_from_inverse(&mut self, side: Side, target_id: &str, owner: &Reference) {
        let Some(entry) = self.side_mut(side).get_mut(target_id) else {
            return;
        };
        if matches!(&entry.data, PayloadData::Single(current) if current == owner) {
            entry.data = PayloadData::Empty;
            entry.is_inverse_derived = true;
        } else if let PayloadData::List(references) = &mut entry.data {
            let before = references.len();
            references.retain(|r| r != owner);
            if references.len() != before {
                entry.is_inverse_derived = true;
            }
        }
    }

    /// Record that `owner` references the entity at `target_id` on `side`.
    fn add_to_inverse(
        &mut self,
        side: Side,
        kind: Cardinality,
        target_id: &str,
        owner: &Reference,
    ) {
        let entries = self.side_mut(side);
        match kind {
            Cardinality::HasMany => {
                let entry = entries
                    .entry(target_id.to_string())
                    .or_insert_with(|| PayloadEntry::derived(PayloadData::List(Vec::new())));
                match &mut entry.data {
                    PayloadData::List(references) => {
                        if !references.contains(owner) {
                            references.push(owner.clone());
                            entry.is_inverse_derived = true;
                        }
                    }
                    shape => {
                        *shape = PayloadData::List(vec![owner.clone()]);
                        entry.is_inverse_derived = true;
                    }
                }
            }
            Cardinality::BelongsTo => {
                entries.insert(
                    target_id.to_string(),
                    PayloadEntry::derived(PayloadData::Single(owner.clone())),
                );
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
