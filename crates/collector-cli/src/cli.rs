//! CLI argument definitions and parsing.
//!
//! Defines the command-line interface structure using clap:
//! - `Cli` - Main CLI entry point
//! - `Commands` - Available subcommands

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::actions::ConfigAction;

/// Collector - host for the collector-web guest and repository hooks.
#[derive(Parser, Debug)]
#[command(name = "collector")]
#[command(version, about, long_about = None)]
#[command(author = "Collector Team")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text, pretty); defaults to the configured format
    #[arg(long = "format", global = true)]
    pub format: Option<String>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a guest module and settle the promises it awaits.
    ///
    /// The module may be binary WebAssembly or text format. Promises the
    /// guest awaits are described by a TOML fixture:
    ///
    /// ```toml
    /// [[promise]]
    /// id = 7
    /// resolve = "ok"
    /// delay_ms = 10
    /// ```
    ///
    /// # Examples
    ///
    /// ```bash
    /// collector run collector.wasm --promises promises.toml
    /// collector run guest.wat --entry start --format json
    /// ```
    Run {
        /// Path to the guest module (.wasm or .wat)
        module: PathBuf,

        /// Exported entry point of type `() -> i32`
        #[arg(short, long, default_value = "main")]
        entry: String,

        /// TOML file describing host promises
        #[arg(short, long)]
        promises: Option<PathBuf>,

        /// Override the guest memory limit in MB
        #[arg(long)]
        memory_limit: Option<usize>,
    },

    /// Make every file end in exactly one newline.
    #[command(name = "end-of-file")]
    EndOfFile {
        /// Files to fix in place
        files: Vec<PathBuf>,
    },

    /// Strip trailing whitespace from every line.
    #[command(name = "trailing-whitespace")]
    TrailingWhitespace {
        /// Files to fix in place
        files: Vec<PathBuf>,
    },

    /// Check spelling with `typos`, honoring the repository's exclusions.
    Typos {
        /// Files to check
        files: Vec<PathBuf>,
    },

    /// Check spelling with `codespell`.
    Codespell {
        /// Files to check
        files: Vec<PathBuf>,
    },

    /// Run the commit-hook checks in order: end-of-file,
    /// trailing-whitespace, typos.
    ///
    /// Stops at the first check that fails.
    Staged {
        /// Staged files
        files: Vec<PathBuf>,
    },

    /// Manage the CLI configuration file.
    Config {
        /// Configuration action
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions.
    ///
    /// # Examples
    ///
    /// ```bash
    /// collector completions bash > /etc/bash_completion.d/collector
    /// ```
    Completions {
        /// Target shell for completion generation
        #[arg(value_enum)]
        shell: Shell,
    },
}
