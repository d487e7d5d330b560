//! Collector CLI.
//!
//! Hosts the `collector-web` guest module and runs the repository's
//! pre-commit hygiene checks.
//!
//! # Examples
//!
//! ```bash
//! # Run a guest with promises described in a fixture
//! collector run collector.wasm --promises promises.toml
//!
//! # Fix staged files
//! collector end-of-file src/main.ts README.md
//! collector trailing-whitespace src/main.ts README.md
//! ```

use anyhow::Result;
use clap::Parser;
use collector_cli::cli::Cli;
use collector_cli::commands::config::load_config;
use collector_cli::runner::{execute_command, init_logging};
use collector_core::cli::OutputFormat;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config()?;

    init_logging(cli.verbose, &config.general.log_level)?;

    let output_format = cli
        .format
        .as_deref()
        .unwrap_or(&config.general.default_format)
        .parse::<OutputFormat>()
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let exit_code = execute_command(cli.command, output_format, &config).await?;

    std::process::exit(exit_code.as_i32());
}
