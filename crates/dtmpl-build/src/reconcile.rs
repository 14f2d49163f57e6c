use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use dtmpl_core::{DockerfileTarget, MappingTable, Variant, VersionSelection};
use tempfile::NamedTempFile;

use crate::diff::{DiffError, DiffOutcome, unified_diff};
use crate::renderer::{RenderError, RenderRequest, Renderer};
use crate::shell::{CommandRunner, RealRunner};

/// Run-wide reconcile settings.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub workdir: PathBuf,
    /// `image` render variable; also prefixes reported paths.
    pub image: String,
    /// Report updated paths without their diff bodies.
    pub quiet: bool,
    /// Report changes but never touch the targets.
    pub dry_run: bool,
}

/// Terminal state of one (version, variant) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Rendered content differed from the target (written unless dry-run).
    Updated,
    Unchanged,
    /// The variant is mapped to `null`; nothing was rendered.
    SkippedNoMapping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileEntry {
    pub variant: Variant,
    /// `None` for [`Outcome::SkippedNoMapping`], which covers the whole variant.
    pub version: Option<String>,
    pub outcome: Outcome,
}

impl ReconcileEntry {
    pub fn target(&self) -> Option<DockerfileTarget> {
        self.version
            .as_ref()
            .map(|version| DockerfileTarget::new(version.clone(), self.variant.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
}

impl ReconcileReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn updated_targets(&self) -> Vec<DockerfileTarget> {
        self.entries
            .iter()
            .filter(|e| e.outcome == Outcome::Updated)
            .filter_map(ReconcileEntry::target)
            .collect()
    }
}

/// Keeps `<version>/<variant>/Dockerfile` files in sync with their templates.
///
/// Pairs are processed strictly one after another. The first failure aborts
/// the run; targets already written stay in place, and a re-run picks up where
/// it stopped since unchanged targets are left alone.
pub struct ReconcileEngine<R: Renderer, X: CommandRunner = RealRunner> {
    renderer: R,
    runner: X,
    options: ReconcileOptions,
}

impl<R: Renderer> ReconcileEngine<R, RealRunner> {
    pub fn new(renderer: R, options: ReconcileOptions) -> Self {
        Self::with_runner(renderer, RealRunner, options)
    }
}

impl<R: Renderer, X: CommandRunner> ReconcileEngine<R, X> {
    pub fn with_runner(renderer: R, runner: X, options: ReconcileOptions) -> Self {
        Self {
            renderer,
            runner,
            options,
        }
    }

    /// Reconcile every variant against its mapped versions.
    ///
    /// Variants absent from `mapping` apply to all of `versions`.
    pub async fn run(
        &self,
        versions: &[String],
        variants: &[Variant],
        mapping: &MappingTable,
    ) -> Result<ReconcileReport, ReconcileError> {
        let mut report = ReconcileReport::default();

        for variant in variants {
            let mapped = match mapping.versions_for(variant, versions) {
                VersionSelection::Skip => {
                    tracing::debug!(%variant, "no versions will be processed");
                    report.entries.push(ReconcileEntry {
                        variant: variant.clone(),
                        version: None,
                        outcome: Outcome::SkippedNoMapping,
                    });
                    continue;
                }
                VersionSelection::Versions(mapped) => mapped,
            };
            tracing::debug!(%variant, versions = ?mapped, "variant mapped to versions");

            for version in mapped {
                let outcome = self.reconcile(version, variant).await?;
                report.entries.push(ReconcileEntry {
                    variant: variant.clone(),
                    version: Some(version.clone()),
                    outcome,
                });
            }
        }

        Ok(report)
    }

    /// Render, diff, and (unless dry-run) replace a single target.
    pub async fn reconcile(
        &self,
        version: &str,
        variant: &Variant,
    ) -> Result<Outcome, ReconcileError> {
        let target = DockerfileTarget::new(version, variant.clone());
        let target_path = self.options.workdir.join(target.relative_path());

        // Dropped (and deleted) on every return path.
        let rendered = scratch_file(&format!("docker-rendered-{}-", scratch_tag(&target)))?;
        let request = RenderRequest {
            version: version.to_owned(),
            variant: variant.clone(),
            image: self.options.image.clone(),
        };
        self.renderer
            .render(&request, rendered.path())
            .await
            .map_err(|e| ReconcileError::Render {
                target: target.to_string(),
                source: e,
            })?;

        // A missing target is diffed against an empty file, so creation shows up as a change.
        let empty_baseline = if target_path.is_file() {
            None
        } else {
            Some(scratch_file(&format!("Dockerfile-{}-", scratch_tag(&target)))?)
        };
        let baseline = empty_baseline
            .as_ref()
            .map_or(target_path.as_path(), NamedTempFile::path);

        let diff = unified_diff(
            &self.runner,
            baseline,
            rendered.path(),
            &self.options.workdir,
        )
        .await
        .map_err(|e| ReconcileError::Diff { source: e })?;

        let body = match diff {
            DiffOutcome::Identical => {
                tracing::debug!(dockerfile = %target, "no content to update");
                return Ok(Outcome::Unchanged);
            }
            DiffOutcome::Changed(body) => body,
        };

        let reported = Path::new(&self.options.image).join(target.relative_path());
        if self.options.quiet {
            tracing::info!("{}", reported.display());
        } else {
            tracing::info!("***** content update {} *****", reported.display());
            tracing::info!("{body}");
        }

        if self.options.dry_run {
            tracing::debug!(dockerfile = %target, "dry-run, leaving target untouched");
        } else {
            replace_target(rendered.path(), &target_path)?;
        }
        Ok(Outcome::Updated)
    }
}

/// Copy `rendered` next to `target` and rename it into place, creating parent
/// directories as needed.
fn replace_target(rendered: &Path, target: &Path) -> Result<(), ReconcileError> {
    let parent = target
        .parent()
        .ok_or_else(|| ReconcileError::NoParent(target.to_path_buf()))?;
    tracing::debug!(path = %parent.display(), "creating parent directories");
    fs::create_dir_all(parent).map_err(|e| ReconcileError::CreateDir {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let content = fs::read(rendered).map_err(|e| ReconcileError::ReadRendered {
        path: rendered.to_path_buf(),
        source: e,
    })?;

    let replace_err = |e| ReconcileError::Replace {
        path: target.to_path_buf(),
        source: e,
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".Dockerfile-")
        .tempfile_in(parent)
        .map_err(replace_err)?;
    staged.write_all(&content).map_err(replace_err)?;
    apply_permissions(staged.as_file(), target).map_err(replace_err)?;

    tracing::debug!(path = %target.display(), "moving rendered Dockerfile into place");
    staged.persist(target).map_err(|e| replace_err(e.error))?;
    Ok(())
}

/// Keep an existing target's permissions; new targets get regular file permissions.
fn apply_permissions(file: &fs::File, target: &Path) -> std::io::Result<()> {
    match fs::metadata(target) {
        Ok(meta) => file.set_permissions(meta.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => set_default_permissions(file),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn set_default_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

fn scratch_file(prefix: &str) -> Result<NamedTempFile, ReconcileError> {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempfile()
        .map_err(|e| ReconcileError::TempFile { source: e })
}

/// `<version>_<variant>` with path separators flattened, for temp file names.
fn scratch_tag(target: &DockerfileTarget) -> String {
    format!("{}_{}", target.version, target.variant.as_str()).replace(['/', '\\'], "_")
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to render {target}")]
    Render { target: String, source: RenderError },

    #[error("failed to diff rendered Dockerfile")]
    Diff { source: DiffError },

    #[error("failed to create temporary file")]
    TempFile { source: std::io::Error },

    #[error("failed to read rendered Dockerfile at {path}")]
    ReadRendered {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("target {0} has no parent directory")]
    NoParent(PathBuf),

    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to replace {path}")]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },
}
