use std::path::Path;
use std::process::Stdio;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("failed to run `{program}`; is it installed and on PATH?")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Outcome of one finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResult {
    /// The command line, for log and error messages.
    pub command: String,
    /// stdout followed by stderr, lossily decoded.
    pub output: String,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ShellResult {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn failed(&self) -> bool {
        !self.success()
    }
}

/// Abstraction over external command execution for testability.
///
/// Production code uses [`RealRunner`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` in `cwd` and wait for it to exit.
    ///
    /// A non-zero exit is reported through [`ShellResult::code`], not as an error.
    async fn run(&self, program: &str, args: &[String], cwd: &Path)
    -> Result<ShellResult, ShellError>;
}

/// Runs commands as child processes, one at a time.
pub struct RealRunner;

impl CommandRunner for RealRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<ShellResult, ShellError> {
        let command = command_line(program, args);
        tracing::debug!(%command, "running");

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ShellError::Spawn {
                program: program.to_owned(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ShellResult {
            command,
            output: combined,
            code: output.status.code(),
        })
    }
}

/// Render `program args...` as a single line.
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
