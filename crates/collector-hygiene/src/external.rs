//! Pass-through to external spell checkers.
//!
//! The tools inherit stdout and stderr, so their reports reach the terminal
//! unchanged. Their exit code becomes ours.

use collector_core::{Error, Result};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Finds `tool` on `PATH`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if it is not there.
pub fn locate(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|e| {
        tracing::debug!("which {}: {}", tool, e);
        Error::ToolNotFound {
            tool: tool.to_string(),
        }
    })
}

/// Top-level directory of the enclosing git work tree.
///
/// # Errors
///
/// Returns [`Error::GitRootNotFound`] if `git` is missing, fails, or prints
/// nothing.
pub async fn git_root() -> Result<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            tracing::debug!("git rev-parse failed to start: {}", e);
            Error::GitRootNotFound
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let root = stdout.lines().next().unwrap_or_default().trim();
    if !output.status.success() || root.is_empty() {
        return Err(Error::GitRootNotFound);
    }
    Ok(PathBuf::from(root))
}

/// Path from `base` to `path`, using `..` where `path` is outside `base`.
///
/// Both paths must be absolute, or both relative to the same directory.
///
/// # Examples
///
/// ```
/// use collector_hygiene::external::relative_to;
/// use std::path::Path;
///
/// let rel = relative_to(Path::new("/repo"), Path::new("/repo/web/main.ts"));
/// assert_eq!(rel, Path::new("web/main.ts"));
///
/// let rel = relative_to(Path::new("/repo/web"), Path::new("/repo/tools/a.ts"));
/// assert_eq!(rel, Path::new("../tools/a.ts"));
/// ```
#[must_use]
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = path.components().collect();
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative: PathBuf = base[common..].iter().map(|_| Component::ParentDir).collect();
    relative.extend(&target[common..]);

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

/// Resolves `path` against the working directory, following symlinks when
/// the file exists.
async fn resolve(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = tokio::fs::canonicalize(path).await {
        return Ok(canonical);
    }
    std::path::absolute(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs `typos --force-exclude` on `files`.
///
/// Paths are passed relative to the git root and the tool runs from there,
/// so the exclusion list in the repository's typos config applies even to
/// files named on the command line.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`], [`Error::GitRootNotFound`], or
/// [`Error::Io`] if the tool cannot be spawned.
pub async fn run_typos(files: &[PathBuf]) -> Result<i32> {
    let typos = locate("typos")?;
    let root = git_root().await?;
    let resolved_root = resolve(&root).await?;

    let mut args = vec![OsString::from("--force-exclude")];
    for file in files {
        let absolute = resolve(file).await?;
        args.push(relative_to(&resolved_root, &absolute).into_os_string());
    }

    run_inherited(&typos, &args, Some(&root)).await
}

/// Runs `codespell` on `files`.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`], or [`Error::Io`] if the tool cannot be
/// spawned.
pub async fn run_codespell(files: &[PathBuf]) -> Result<i32> {
    let codespell = locate("codespell")?;
    let args: Vec<_> = files.iter().map(|f| f.as_os_str().to_owned()).collect();
    run_inherited(&codespell, &args, None).await
}

async fn run_inherited(
    program: &Path,
    args: &[OsString],
    current_dir: Option<&Path>,
) -> Result<i32> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = current_dir {
        command.current_dir(dir);
    }

    tracing::debug!("Running {} with {} argument(s)", program.display(), args.len());
    let status = command.status().await.map_err(|source| Error::Io {
        path: program.to_path_buf(),
        source,
    })?;

    // Killed by a signal: no code, report failure.
    let code = status.code().unwrap_or(1);
    tracing::debug!("{} exited with {}", program.display(), code);
    Ok(code)
}
