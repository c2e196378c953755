//! # tether CLI Module
//!
//! This module implements the CLI interface for tether.
//!
//! ## Available Commands
//!
//! - `check` - Validate a schema and list its relationship pairs
//! - `replay` - Replay a JSON script of store operations

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tether_core::TetherError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// tether - relationship payload cache
///
/// Reconciles one-sided relationship payloads into a consistent two-sided
/// view, driven by a schema file.
#[derive(Parser, Debug)]
#[command(name = "tether")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the schema file (TOML)
    #[arg(short = 's', long, global = true, default_value = "schema.toml")]
    pub schema: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the schema and list relationship pairs
    Check,

    /// Replay a script of store operations
    Replay {
        /// Path to the script file (JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Print the full cache state after the replay
        #[arg(short, long)]
        dump: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), TetherError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Replay { file, dump }) => {
            cmd_replay(&cli.schema, &file, json_mode, dump, cli.verbose)
        }
        Some(Commands::Check) | None => cmd_check(&cli.schema, json_mode),
    }
}
