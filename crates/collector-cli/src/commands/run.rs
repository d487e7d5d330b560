//! Run command implementation.
//!
//! Instantiates a guest module, calls its entry point and drives the
//! promises it awaits until none remain.

use crate::fixture::PromiseFixture;
use crate::formatters::format_output;
use anyhow::{Context, Result};
use collector_bridge::PromiseBridge;
use collector_core::Error;
use collector_core::cli::{ExitCode, OutputFormat};
use collector_wasm_runtime::{ExecutionReport, Runtime, RuntimeConfig};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result printed by `collector run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    /// Module path as given
    pub module: String,
    /// Entry point that was called
    pub entry: String,
    /// Execution summary
    #[serde(flatten)]
    pub report: ExecutionReport,
}

/// Runs the run command.
///
/// Exits with [`ExitCode::GUEST_ERROR`] if the guest traps, lacks a
/// required export, or returns non-zero, and with [`ExitCode::TIMEOUT`] if
/// the entry point or settlement times out.
///
/// # Errors
///
/// Returns an error if the module or fixture cannot be read, or the runtime
/// cannot be configured.
pub async fn run(
    module: PathBuf,
    entry: String,
    promises: Option<PathBuf>,
    runtime_config: RuntimeConfig,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    info!("Running guest module: {}", module.display());

    let result = match execute(&module, &entry, promises.as_deref(), runtime_config).await? {
        Ok(result) => result,
        Err(code) => return Ok(code),
    };

    let exit_code = if result.report.exit_code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::GUEST_ERROR
    };

    let formatted = format_output(&result, output_format).context("failed to format result")?;
    println!("{formatted}");

    Ok(exit_code)
}

/// Executes the module, returning either the result or the exit code of a
/// guest failure that was already reported on stderr.
pub async fn execute(
    module: &Path,
    entry: &str,
    promises: Option<&Path>,
    runtime_config: RuntimeConfig,
) -> Result<std::result::Result<RunResult, ExitCode>> {
    let wasm_bytes = tokio::fs::read(module)
        .await
        .with_context(|| format!("failed to read module {}", module.display()))?;

    let bridge = match promises {
        Some(path) => PromiseFixture::load(path).await?.into_bridge()?,
        None => PromiseBridge::new(),
    };
    info!("{} promise(s) registered", bridge.values().len());

    let runtime = Runtime::new(runtime_config).context("failed to create runtime")?;

    match runtime.execute(&wasm_bytes, entry, bridge).await {
        Ok(report) => Ok(Ok(RunResult {
            module: module.display().to_string(),
            entry: entry.to_string(),
            report,
        })),
        Err(e) => match guest_exit_code(&e) {
            Some(code) => {
                eprintln!("{} {e}", "error:".red().bold());
                Ok(Err(code))
            }
            None => Err(e).context("guest execution failed"),
        },
    }
}

/// Exit code for failures caused by the guest rather than the host.
const fn guest_exit_code(error: &Error) -> Option<ExitCode> {
    if error.is_timeout() {
        Some(ExitCode::TIMEOUT)
    } else if error.is_wasm_error() || error.is_missing_export() || error.is_guest_memory_error() {
        Some(ExitCode::GUEST_ERROR)
    } else {
        None
    }
}
