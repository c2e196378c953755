//! # tether
//!
//! Application layer for the tether relationship cache: schema loading,
//! script replay and the command-line interface.

pub mod cli;
pub mod config;
pub mod script;
