use std::path::{Path, PathBuf};

use dtmpl_core::target::DOCKERFILE_NAME;
use dtmpl_core::{DockerfileTarget, Variant};

use crate::executor::{GitExecutor, RealGit};
use crate::git::GitError;

/// Lists Dockerfiles changed within a revision range.
pub struct ChangedDockerfiles<G: GitExecutor = RealGit> {
    git: G,
}

impl ChangedDockerfiles<RealGit> {
    pub fn new(workdir: &Path) -> Self {
        Self {
            git: RealGit::new(workdir),
        }
    }
}

impl<G: GitExecutor> ChangedDockerfiles<G> {
    pub fn with_executor(git: G) -> Self {
        Self { git }
    }

    /// Paths of files named exactly `Dockerfile` that changed in
    /// `revision_range` (e.g. `HEAD~1` or `v1..v2`), relative to the working tree.
    ///
    /// An empty list means nothing changed; it is not an error.
    pub async fn list_changed(&self, revision_range: &str) -> Result<Vec<String>, ListError> {
        let output = self
            .git
            .exec(&args([
                "diff",
                "--relative",
                "--name-only",
                revision_range,
                "./",
            ]))
            .await
            .map_err(|e| {
                let revision_range = revision_range.to_owned();
                if e.is_unknown_revision() {
                    ListError::UnknownRevision {
                        revision_range,
                        source: e,
                    }
                } else {
                    ListError::Git {
                        revision_range,
                        source: e,
                    }
                }
            })?;

        let changed: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| Path::new(line).file_name().is_some_and(|name| name == DOCKERFILE_NAME))
            .map(str::to_owned)
            .collect();

        tracing::debug!(revision_range, ?changed, "changed Dockerfiles");
        Ok(changed)
    }
}

/// Order `paths` by version, then by the position of each path's variant in
/// `variant_priority`.
///
/// Every variant found in `paths` must appear in `variant_priority`; the
/// default variant is matched by `_default` (or the empty name).
pub fn order_by_variant(
    paths: Vec<String>,
    variant_priority: &[Variant],
) -> Result<Vec<String>, OrderError> {
    let mut keyed = Vec::with_capacity(paths.len());
    for path in paths {
        let target = DockerfileTarget::parse(&path).map_err(|e| OrderError::Layout {
            path: PathBuf::from(&path),
            source: e,
        })?;
        let rank = variant_priority
            .iter()
            .position(|v| *v == target.variant)
            .ok_or_else(|| OrderError::UnknownVariant {
                variant: target.variant.label().to_owned(),
                path: path.clone(),
            })?;
        keyed.push(((target.version, rank), path));
    }

    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(keyed.into_iter().map(|(_, path)| path).collect())
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("git does not know revision range '{revision_range}'")]
    UnknownRevision {
        revision_range: String,
        source: GitError,
    },

    #[error("cannot list Dockerfiles changed in '{revision_range}'")]
    Git {
        revision_range: String,
        source: GitError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("cannot order {path}")]
    Layout {
        path: PathBuf,
        source: dtmpl_core::Error,
    },

    #[error("variant '{variant}' of {path} is missing from the precedence list")]
    UnknownVariant { variant: String, path: String },
}
