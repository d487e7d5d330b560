//! Pre-commit hygiene for the collector repository.
//!
//! Two fixers rewrite staged files in place, and two pass-throughs hand the
//! files to external spell checkers:
//!
//! - [`Check::EndOfFile`]: every file ends in exactly one newline
//! - [`Check::TrailingWhitespace`]: no line ends in whitespace
//! - [`Check::Typos`]: runs `typos` from the git root
//! - [`Check::Codespell`]: runs `codespell`
//!
//! # Examples
//!
//! ```no_run
//! use collector_hygiene::Check;
//! use std::path::PathBuf;
//!
//! # async fn example() -> collector_core::Result<()> {
//! let files = vec![PathBuf::from("README.md")];
//! let code = Check::EndOfFile.run(&files).await?;
//! assert_eq!(code, 0);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod end_of_file;
pub mod external;
pub mod trailing_whitespace;

mod fix;

pub use fix::{FixReport, fix_files};

use collector_core::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Checks run by the commit hook on every staged file, in order.
pub const STAGED_CHECKS: [Check; 3] = [Check::EndOfFile, Check::TrailingWhitespace, Check::Typos];

/// A single hygiene check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    /// Normalize the final newline
    EndOfFile,
    /// Strip trailing whitespace
    TrailingWhitespace,
    /// Run `typos`
    Typos,
    /// Run `codespell`
    Codespell,
}

impl Check {
    /// Command name of the check.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EndOfFile => "end-of-file",
            Self::TrailingWhitespace => "trailing-whitespace",
            Self::Typos => "typos",
            Self::Codespell => "codespell",
        }
    }

    /// Runs the check and returns the process exit code it stands for.
    ///
    /// Fixers return 0 once every file is written. Pass-throughs return the
    /// external tool's exit code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] with the usage line when `files` is
    /// empty, [`Error::ToolNotFound`] if an external tool is missing, and
    /// [`Error::Io`] for read, write or spawn failures.
    pub async fn run(self, files: &[PathBuf]) -> Result<i32> {
        if files.is_empty() {
            return Err(Error::InvalidArgument(usage(self.name())));
        }

        match self {
            Self::EndOfFile => {
                fix_files(files, end_of_file::normalize).await?;
                Ok(0)
            }
            Self::TrailingWhitespace => {
                fix_files(files, trailing_whitespace::fix).await?;
                Ok(0)
            }
            Self::Typos => external::run_typos(files).await,
            Self::Codespell => external::run_codespell(files).await,
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Check {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "end-of-file" => Ok(Self::EndOfFile),
            "trailing-whitespace" => Ok(Self::TrailingWhitespace),
            "typos" => Ok(Self::Typos),
            "codespell" => Ok(Self::Codespell),
            _ => Err(Error::InvalidArgument(format!("unknown check: {s}"))),
        }
    }
}

/// Usage line printed when a check gets no files.
#[must_use]
pub fn usage(command: &str) -> String {
    format!("usage: collector {command} [files...]")
}
