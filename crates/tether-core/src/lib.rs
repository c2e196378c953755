//! # tether-core
//!
//! The bidirectional relationship-payload cache for tether - THE LOGIC.
//!
//! Given partial, possibly one-sided relationship fragments ("user 1 has
//! hobbies [2]", "hobby 2 belongs to user 1"), the cache reconciles both
//! sides of each relationship into a consistent view without ever
//! materializing entity records.
//!
//! ## Architectural Constraints
//!
//! - Single-threaded and synchronous; no async, no network
//! - Deterministic: `BTreeMap`/`BTreeSet` only, no `HashMap`
//! - Never fetches, persists or validates data; it only reconciles
//!   already-parsed fragments
//! - Schema and residency are external collaborators (`Schema`, `Residency`)

// =============================================================================
// MODULES
// =============================================================================

pub mod ledger;
pub mod primitives;
pub mod registry;
pub mod schema;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Cardinality, IdValue, PayloadData, PayloadEntry, RawLinkage, Reference,
    RelationshipFragment, RelationshipFragments, ResourceIdentifier, TetherError,
};

// =============================================================================
// RE-EXPORTS: Cache
// =============================================================================

pub use ledger::{LedgerSnapshot, RelationshipLedger, Side, SideKey};
pub use registry::{PayloadRegistry, RelationshipInfo};
pub use schema::{
    InverseRef, RecordSet, RelationshipDefinition, RelationshipMeta, Residency, Schema,
    SchemaDefinition, StaticSchema, TypeDefinition,
};
pub use store::Store;
