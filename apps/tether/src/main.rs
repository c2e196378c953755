//! # tether - Relationship Payload Cache CLI
//!
//! The main binary for the tether relationship cache.
//!
//! ## Usage
//!
//! ```bash
//! # Validate a schema and list relationship pairs
//! tether check -s schema.toml
//!
//! # Replay a script and dump the reconciled cache
//! tether replay -s schema.toml -f script.json --dump
//! ```

use clap::Parser;
use tether::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // TETHER_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TETHER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tether=info,tether_core=info".into());

    // stdout is reserved for command output.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the tether startup banner.
fn print_banner() {
    println!("tether v{} - relationship payload cache", env!("CARGO_PKG_VERSION"));
    println!();
}
