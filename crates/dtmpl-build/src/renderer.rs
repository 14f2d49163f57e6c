use std::io::Write;
use std::path::{Path, PathBuf};

use dtmpl_core::{RenderContext, Variant};
use tempfile::NamedTempFile;

use crate::shell::{CommandRunner, RealRunner, ShellError};

/// Default templating engine binary.
pub const DEFAULT_ENGINE: &str = "dj";

/// Per-Dockerfile render variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub version: String,
    pub variant: Variant,
    pub image: String,
}

/// Renders one Dockerfile template into a file.
#[allow(async_fn_in_trait)]
pub trait Renderer: Send + Sync {
    /// Render the template selected by `request.variant` into `output`.
    async fn render(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError>;
}

/// [`Renderer`] backed by the docker-djinja (`dj`) command line tool.
///
/// The shared [`RenderContext`] is written once, as YAML, to a temporary
/// config file that lives as long as the renderer.
pub struct DjinjaRenderer<X: CommandRunner = RealRunner> {
    runner: X,
    program: String,
    program_args: Vec<String>,
    workdir: PathBuf,
    config_file: NamedTempFile,
}

impl DjinjaRenderer<RealRunner> {
    pub fn new(workdir: &Path, context: &RenderContext) -> Result<Self, RenderError> {
        Self::with_runner(RealRunner, workdir, context)
    }
}

impl<X: CommandRunner> DjinjaRenderer<X> {
    pub fn with_runner(
        runner: X,
        workdir: &Path,
        context: &RenderContext,
    ) -> Result<Self, RenderError> {
        let blob = serde_yaml::to_string(&context.config_blob())
            .map_err(|e| RenderError::ConfigSerialize { source: e })?;

        let mut config_file = tempfile::Builder::new()
            .prefix("dtmpl-config-")
            .suffix(".yaml")
            .tempfile()
            .map_err(|e| RenderError::ConfigWrite { source: e })?;
        config_file
            .write_all(blob.as_bytes())
            .and_then(|()| config_file.flush())
            .map_err(|e| RenderError::ConfigWrite { source: e })?;
        tracing::debug!(path = %config_file.path().display(), config = %blob, "engine config written");

        Ok(Self {
            runner,
            program: DEFAULT_ENGINE.to_owned(),
            program_args: Vec::new(),
            workdir: workdir.to_path_buf(),
            config_file,
        })
    }

    /// Use a different engine command line, e.g. `"python -m djinja"`.
    ///
    /// The first word is the program, the rest are leading arguments.
    pub fn with_engine(mut self, command: &str) -> Self {
        let mut words = command.split_whitespace().map(str::to_owned);
        if let Some(program) = words.next() {
            self.program = program;
            self.program_args = words.collect();
        }
        self
    }

    pub fn config_path(&self) -> &Path {
        self.config_file.path()
    }

    /// `Dockerfile.template` for the default variant, `Dockerfile.template-<variant>` otherwise.
    pub fn template_path(&self, variant: &Variant) -> PathBuf {
        self.workdir.join(variant.template_file_name())
    }

    /// Arguments passed to the engine after any leading engine arguments.
    pub fn engine_args(
        &self,
        request: &RenderRequest,
        output: &Path,
    ) -> Result<Vec<String>, RenderError> {
        let template = self.template_path(&request.variant);
        let mut args = self.program_args.clone();
        args.extend([
            "-q".to_owned(),
            "-c".to_owned(),
            path_arg(self.config_path())?,
            "-d".to_owned(),
            path_arg(&template)?,
            "-o".to_owned(),
            path_arg(output)?,
            "-e".to_owned(),
            format!("version={}", request.version),
            "-e".to_owned(),
            format!("variant={}", request.variant.label()),
            "-e".to_owned(),
            format!("image={}", request.image),
        ]);
        Ok(args)
    }
}

impl<X: CommandRunner> Renderer for DjinjaRenderer<X> {
    async fn render(&self, request: &RenderRequest, output: &Path) -> Result<(), RenderError> {
        let args = self.engine_args(request, output)?;
        let result = self
            .runner
            .run(&self.program, &args, &self.workdir)
            .await
            .map_err(|e| RenderError::Engine { source: e })?;

        if result.failed() {
            return Err(RenderError::Failed {
                command: result.command,
                output: result.output,
            });
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> Result<String, RenderError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| RenderError::NonUtf8Path(path.to_path_buf()))
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize the engine config")]
    ConfigSerialize { source: serde_yaml::Error },

    #[error("failed to write the engine config file")]
    ConfigWrite { source: std::io::Error },

    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("failed to start the templating engine")]
    Engine { source: ShellError },

    #[error("templating engine failed: `{command}`\n{output}")]
    Failed { command: String, output: String },
}
