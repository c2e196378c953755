//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{MAX_SCRIPT_FILE_SIZE, load_schema, read_bounded};
use crate::script::{parse_script, replay};
use std::path::Path;
use tether_core::{Store, TetherError};

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Validate the schema and list every relationship with its inverse.
pub fn cmd_check(schema_path: &Path, json_mode: bool) -> Result<(), TetherError> {
    let schema = load_schema(schema_path)?;

    if json_mode {
        let pairs: Vec<serde_json::Value> = schema
            .pairs()
            .map(|(type_name, meta, inverse)| {
                serde_json::json!({
                    "type": type_name,
                    "relationship": meta.name,
                    "kind": meta.kind,
                    "target": meta.target,
                    "inverse": inverse,
                })
            })
            .collect();
        let output = serde_json::json!({
            "schema": schema_path.to_string_lossy(),
            "types": schema.type_names().collect::<Vec<_>>(),
            "relationships": pairs,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("tether Schema");
    println!("=============");
    println!("Schema: {:?}", schema_path);
    println!();
    for (type_name, meta, inverse) in schema.pairs() {
        let kind = if meta.kind.is_many() { "has-many" } else { "belongs-to" };
        match inverse {
            Some(inv) if inv.type_name == type_name && inv.relationship == meta.name => println!(
                "  {}:{} ({} {}) <-> itself (reflexive)",
                type_name, meta.name, kind, meta.target
            ),
            Some(inv) => println!(
                "  {}:{} ({} {}) <-> {}:{}",
                type_name, meta.name, kind, meta.target, inv.type_name, inv.relationship
            ),
            None => println!(
                "  {}:{} ({} {}) (no inverse)",
                type_name, meta.name, kind, meta.target
            ),
        }
    }

    Ok(())
}

// =============================================================================
// REPLAY COMMAND
// =============================================================================

/// Replay a script against a fresh store built from the schema.
pub fn cmd_replay(
    schema_path: &Path,
    script_path: &Path,
    json_mode: bool,
    dump: bool,
    verbose: bool,
) -> Result<(), TetherError> {
    let schema = load_schema(schema_path)?;

    tracing::info!("Replaying {:?}", script_path);
    let source = read_bounded(script_path, MAX_SCRIPT_FILE_SIZE)?;
    let ops = parse_script(&source)?;

    let mut store = Store::new(schema);
    let results = replay(&mut store, ops);
    let snapshot = dump.then(|| store.snapshot());

    if json_mode {
        let output = serde_json::json!({
            "results": results,
            "ledgers": snapshot,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    for result in &results {
        println!("[{}] {}", result.step, result);
    }

    if verbose {
        println!();
        println!("Ledgers:  {}", store.payloads().ledger_count());
        println!("Records:  {}", store.records().len());
    }

    if let Some(ledgers) = snapshot {
        println!();
        println!(
            "{}",
            serde_json::to_string_pretty(&ledgers).unwrap_or_default()
        );
    }

    Ok(())
}
