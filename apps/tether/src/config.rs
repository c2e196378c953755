//! # Configuration Loading
//!
//! Reads the schema document (TOML) and script files from disk.
//!
//! ## Schema format
//!
//! ```toml
//! [types.user.relationships.hobbies]
//! kind = "has-many"
//! target = "hobby"
//!
//! [types.hobby.relationships.user]
//! kind = "belongs-to"
//! target = "user"
//! ```

use std::path::{Path, PathBuf};
use tether_core::{SchemaDefinition, StaticSchema, TetherError};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a schema file (1 MB).
pub const MAX_SCHEMA_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of a script file (100 MB).
pub const MAX_SCRIPT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Resolve a path to an existing regular file.
pub fn validate_file_path(path: &Path) -> Result<PathBuf, TetherError> {
    let canonical = path.canonicalize().map_err(|e| {
        TetherError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(TetherError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Reject files larger than `max_size` before reading them.
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<(), TetherError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| TetherError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(TetherError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Read a whole text file after path and size validation.
pub fn read_bounded(path: &Path, max_size: u64) -> Result<String, TetherError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, max_size)?;
    std::fs::read_to_string(&validated)
        .map_err(|e| TetherError::IoError(format!("Read '{}': {}", path.display(), e)))
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Parse and validate a schema document.
pub fn schema_from_toml_str(source: &str) -> Result<StaticSchema, TetherError> {
    let definition: SchemaDefinition = toml::from_str(source)
        .map_err(|e| TetherError::SerializationError(format!("Schema: {}", e)))?;
    StaticSchema::from_definition(&definition)
}

/// Load and validate a schema file.
pub fn load_schema(path: &Path) -> Result<StaticSchema, TetherError> {
    let source = read_bounded(path, MAX_SCHEMA_FILE_SIZE)?;
    let schema = schema_from_toml_str(&source)?;
    tracing::info!(path = %path.display(), types = schema.type_names().count(), "schema loaded");
    Ok(schema)
}
