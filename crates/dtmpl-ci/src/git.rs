use std::path::PathBuf;

/// A git invocation inside the Dockerfile tree that did not produce a path list.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("cannot run `{binary}` in {workdir}; install git or point $GIT at it")]
    Spawn {
        binary: String,
        workdir: PathBuf,
        source: std::io::Error,
    },

    #[error("`git {}` failed ({status}): {}", .args.join(" "), .stderr.trim_end())]
    Failed {
        args: Vec<String>,
        status: String,
        stderr: String,
    },

    #[error("git listed a path that is not valid UTF-8")]
    NonUtf8Output { source: std::string::FromUtf8Error },
}

impl GitError {
    /// Git could not resolve a revision named in the range.
    pub fn is_unknown_revision(&self) -> bool {
        match self {
            Self::Failed { stderr, .. } => {
                stderr.contains("unknown revision")
                    || stderr.contains("bad revision")
                    || stderr.contains("Invalid revision range")
            }
            Self::Spawn { .. } | Self::NonUtf8Output { .. } => false,
        }
    }
}
