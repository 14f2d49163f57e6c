use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::git::GitError;

/// Runs git commands against the Dockerfile tree.
///
/// [`RealGit`] spawns the git binary; tests substitute mockall mocks.
#[allow(async_fn_in_trait)]
pub trait GitExecutor: Send + Sync {
    /// Run `git <args>` and return its stdout.
    async fn exec(&self, args: &[String]) -> Result<String, GitError>;
}

/// The git binary, always run inside one working tree.
pub struct RealGit {
    binary: String,
    workdir: PathBuf,
}

impl RealGit {
    pub fn new(workdir: &Path) -> Self {
        Self {
            binary: "git".to_owned(),
            workdir: workdir.to_path_buf(),
        }
    }

    /// Use a specific git binary, e.g. from `$GIT`.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

impl GitExecutor for RealGit {
    async fn exec(&self, args: &[String]) -> Result<String, GitError> {
        tracing::debug!(binary = %self.binary, workdir = %self.workdir.display(), ?args, "running git");

        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GitError::Spawn {
                binary: self.binary.clone(),
                workdir: self.workdir.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(GitError::Failed {
                args: args.to_vec(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        String::from_utf8(output.stdout).map_err(|e| GitError::NonUtf8Output { source: e })
    }
}
