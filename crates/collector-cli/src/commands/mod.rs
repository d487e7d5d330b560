//! Command implementations for the collector CLI.
//!
//! Each command module executes one subcommand and formats its output
//! according to the requested format.

pub mod completions;
pub mod config;
pub mod hygiene;
pub mod run;
