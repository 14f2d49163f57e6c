use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("argument -e (--env) expects value in form key=value, you passed: {arg}")]
    MalformedEnv { arg: String },

    // ── Filesystem discovery ──
    #[error("failed to list directory {path}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("working directory is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    #[error("invalid glob pattern {pattern:?}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("cannot read a match of glob pattern {pattern:?}")]
    GlobEntry {
        pattern: String,
        source: glob::GlobError,
    },

    #[error("{path:?} does not follow the <version>/<variant>/Dockerfile layout: {reason}")]
    InvalidTarget { path: String, reason: &'static str },
}
