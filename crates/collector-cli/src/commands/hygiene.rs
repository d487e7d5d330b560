//! Hygiene commands: `end-of-file`, `trailing-whitespace`, `typos`,
//! `codespell` and `staged`.
//!
//! These run from the commit hook, so they print nothing on success and
//! report problems on stderr. Their exit code is what the hook sees.

use anyhow::{Context, Result};
use collector_core::Error;
use collector_core::cli::ExitCode;
use collector_hygiene::{Check, STAGED_CHECKS, usage};
use std::path::PathBuf;
use tracing::info;

/// Runs one check on `files`.
///
/// A missing file list prints the usage line and exits 1. A missing tool
/// or git root prints the reason and exits 1. External tools' exit codes
/// pass through.
///
/// # Errors
///
/// Returns an error for I/O failures on the files themselves.
pub async fn run(check: Check, files: &[PathBuf]) -> Result<ExitCode> {
    info!("Running {} on {} file(s)", check, files.len());

    match check.run(files).await {
        Ok(code) => Ok(ExitCode::from_i32(code)),
        Err(e) => match exit_code_for(check, &e) {
            Some(code) => Ok(code),
            None => Err(e).with_context(|| format!("{check} failed")),
        },
    }
}

/// Runs the commit-hook checks in order, stopping at the first failure.
///
/// # Errors
///
/// Returns an error for I/O failures on the files themselves.
pub async fn run_staged(files: &[PathBuf]) -> Result<ExitCode> {
    if files.is_empty() {
        eprintln!("{}", usage("staged"));
        return Ok(ExitCode::USAGE);
    }

    for check in STAGED_CHECKS {
        let code = run(check, files).await?;
        if !code.is_success() {
            return Ok(code);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Exit code for errors the hook reports without a backtrace.
fn exit_code_for(check: Check, error: &Error) -> Option<ExitCode> {
    match error {
        Error::InvalidArgument(_) => {
            eprintln!("{}", usage(check.name()));
            Some(ExitCode::USAGE)
        }
        Error::ToolNotFound { .. } | Error::GitRootNotFound => {
            eprintln!("{error}");
            Some(ExitCode::ERROR)
        }
        _ => None,
    }
}
