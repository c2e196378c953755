//! # Replay Scripts
//!
//! A script is a JSON array of store operations applied in order to a
//! fresh `Store`:
//!
//! ```json
//! [
//!   {"op": "push", "type": "user", "id": 1,
//!    "relationships": {"hobbies": {"data": [{"type": "hobby", "id": 2}]}}},
//!   {"op": "get", "type": "hobby", "id": 2, "relationship": "user"},
//!   {"op": "materialize", "type": "hobby", "id": 2},
//!   {"op": "unload", "type": "user", "id": 1}
//! ]
//! ```
//!
//! Every `get` produces one `GetResult`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tether_core::{
    IdValue, PayloadData, PayloadEntry, RelationshipFragments, Schema, Store, TetherError,
};

/// Maximum number of operations in one script.
pub const MAX_SCRIPT_OPS: usize = 100_000;

/// One store operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Ingest a resource's relationship section.
    Push {
        /// Entity type.
        #[serde(rename = "type")]
        type_name: String,
        /// Entity id.
        id: IdValue,
        /// Relationship fragments keyed by name.
        #[serde(default)]
        relationships: RelationshipFragments,
    },
    /// Read one reconciled relationship.
    Get {
        /// Entity type.
        #[serde(rename = "type")]
        type_name: String,
        /// Entity id.
        id: IdValue,
        /// Relationship name.
        relationship: String,
    },
    /// Evict an entity.
    Unload {
        /// Entity type.
        #[serde(rename = "type")]
        type_name: String,
        /// Entity id.
        id: IdValue,
    },
    /// Mark an entity as having a materialized record.
    Materialize {
        /// Entity type.
        #[serde(rename = "type")]
        type_name: String,
        /// Entity id.
        id: IdValue,
    },
}

/// The outcome of one `get` operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetResult {
    /// Zero-based index of the operation in the script.
    pub step: usize,
    /// Entity type.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Entity id.
    pub id: String,
    /// Relationship name.
    pub relationship: String,
    /// Reconciled entry, `None` when nothing is cached.
    pub entry: Option<PayloadEntry>,
}

impl fmt::Display for GetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {} => ", self.type_name, self.id, self.relationship)?;
        let Some(entry) = &self.entry else {
            return f.write_str("(not cached)");
        };
        match &entry.data {
            PayloadData::Empty => f.write_str("null")?,
            PayloadData::Single(reference) => write!(f, "{reference}")?,
            PayloadData::List(references) => {
                let items: Vec<String> = references.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))?;
            }
        }
        if entry.is_inverse_derived {
            f.write_str(" (inverse-derived)")?;
        }
        Ok(())
    }
}

/// Parse a script document.
pub fn parse_script(source: &str) -> Result<Vec<ScriptOp>, TetherError> {
    let ops: Vec<ScriptOp> = serde_json::from_str(source)
        .map_err(|e| TetherError::SerializationError(format!("Script: {}", e)))?;

    if ops.len() > MAX_SCRIPT_OPS {
        return Err(TetherError::SerializationError(format!(
            "Script has {} operations, maximum is {}",
            ops.len(),
            MAX_SCRIPT_OPS
        )));
    }
    Ok(ops)
}

/// Apply every operation to `store`, collecting `get` results.
pub fn replay<S: Schema>(store: &mut Store<S>, ops: Vec<ScriptOp>) -> Vec<GetResult> {
    let mut results = Vec::new();
    let total = ops.len();

    for (step, op) in ops.into_iter().enumerate() {
        match op {
            ScriptOp::Push {
                type_name,
                id,
                relationships,
            } => store.push(&type_name, &id.to_string(), relationships),
            ScriptOp::Get {
                type_name,
                id,
                relationship,
            } => {
                let id = id.to_string();
                let entry = store.get(&type_name, &id, &relationship).cloned();
                results.push(GetResult {
                    step,
                    type_name,
                    id,
                    relationship,
                    entry,
                });
            }
            ScriptOp::Unload { type_name, id } => store.unload(&type_name, &id.to_string()),
            ScriptOp::Materialize { type_name, id } => {
                store.materialize(&type_name, &id.to_string());
            }
        }
    }

    tracing::info!(operations = total, reads = results.len(), "script replayed");
    results
}
