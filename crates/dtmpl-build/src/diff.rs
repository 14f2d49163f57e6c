use std::path::{Path, PathBuf};

use crate::shell::{CommandRunner, ShellError};

/// Result of comparing a baseline file with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Identical,
    /// Unified diff body from baseline to candidate.
    Changed(String),
}

/// Compare two files with `diff -u baseline candidate`.
///
/// `diff` exits 0 for identical files and 1 for differing files; any other
/// exit status is an error. An empty baseline against non-empty content always
/// yields [`DiffOutcome::Changed`].
pub async fn unified_diff<X: CommandRunner>(
    runner: &X,
    baseline: &Path,
    candidate: &Path,
    cwd: &Path,
) -> Result<DiffOutcome, DiffError> {
    let args = vec!["-u".to_owned(), path_arg(baseline)?, path_arg(candidate)?];
    let result = runner
        .run("diff", &args, cwd)
        .await
        .map_err(|e| DiffError::Spawn { source: e })?;

    match result.code {
        Some(0) => Ok(DiffOutcome::Identical),
        Some(1) => Ok(DiffOutcome::Changed(result.output)),
        _ => Err(DiffError::Failed {
            command: result.command,
            output: result.output,
        }),
    }
}

fn path_arg(path: &Path) -> Result<String, DiffError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| DiffError::NonUtf8Path(path.to_path_buf()))
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error("failed to run diff")]
    Spawn { source: ShellError },

    #[error("diff failed: `{command}`\n{output}")]
    Failed { command: String, output: String },

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}
