//! Command execution and runtime logic.
//!
//! Contains the main command dispatch and logging initialization.

use anyhow::Result;
use collector_core::cli::{ExitCode, OutputFormat};
use collector_hygiene::Check;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Commands;
use crate::commands;
use crate::commands::config::Config;

/// Initializes logging infrastructure.
///
/// `RUST_LOG` wins over the configured level; `verbose` forces `debug`.
/// Logs go to stderr so command output on stdout stays parseable.
///
/// # Errors
///
/// Returns an error if logging initialization fails.
pub fn init_logging(verbose: bool, default_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Executes the specified CLI command.
///
/// Routes commands to their respective handlers and returns an exit code.
///
/// # Errors
///
/// Returns an error if command execution fails in a way that has no
/// dedicated exit code.
pub async fn execute_command(
    command: Commands,
    output_format: OutputFormat,
    config: &Config,
) -> Result<ExitCode> {
    match command {
        Commands::Run {
            module,
            entry,
            promises,
            memory_limit,
        } => {
            let runtime_config = config.runtime.to_runtime_config(memory_limit);
            commands::run::run(module, entry, promises, runtime_config, output_format).await
        }
        Commands::EndOfFile { files } => commands::hygiene::run(Check::EndOfFile, &files).await,
        Commands::TrailingWhitespace { files } => {
            commands::hygiene::run(Check::TrailingWhitespace, &files).await
        }
        Commands::Typos { files } => commands::hygiene::run(Check::Typos, &files).await,
        Commands::Codespell { files } => commands::hygiene::run(Check::Codespell, &files).await,
        Commands::Staged { files } => commands::hygiene::run_staged(&files).await,
        Commands::Config { action } => commands::config::run(action, output_format).await,
        Commands::Completions { shell } => {
            use crate::cli::Cli;
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            commands::completions::run(shell, &mut cmd).await
        }
    }
}
