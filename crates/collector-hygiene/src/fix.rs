//! Concurrent in-place file fixing.

use collector_core::{Error, Result};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};

/// Result of fixing a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixReport {
    /// Number of files read
    pub checked: usize,
    /// Files whose content changed and was written back
    pub rewritten: Vec<PathBuf>,
}

impl FixReport {
    /// Returns `true` if no file needed changes.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rewritten.is_empty()
    }
}

/// Applies `transform` to every file concurrently.
///
/// `transform` returns `None` to leave a file alone. Files are only written
/// when the new text differs from what was read.
///
/// # Errors
///
/// Returns [`Error::Io`] for the first file that cannot be read or written.
/// Files that were already processed stay fixed.
pub async fn fix_files<F>(files: &[PathBuf], transform: F) -> Result<FixReport>
where
    F: Fn(&str) -> Option<String> + Copy,
{
    let results = try_join_all(files.iter().map(|path| fix_file(path, transform))).await?;

    let rewritten: Vec<PathBuf> = files
        .iter()
        .zip(results)
        .filter_map(|(path, changed)| changed.then(|| path.clone()))
        .collect();

    tracing::debug!(
        "Fixed {} of {} file(s)",
        rewritten.len(),
        files.len()
    );

    Ok(FixReport {
        checked: files.len(),
        rewritten,
    })
}

async fn fix_file<F>(path: &Path, transform: F) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| io_error(path, source))?;

    let Some(fixed) = transform(&text).filter(|fixed| *fixed != text) else {
        return Ok(false);
    };

    tokio::fs::write(path, fixed)
        .await
        .map_err(|source| io_error(path, source))?;
    tracing::info!("Fixed {}", path.display());
    Ok(true)
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}
