use std::path::{Path, PathBuf};

use tera::{Context, Tera};

/// Registry build request body. Variables: `archive_url`, `tag`, `pull_robot`.
pub const DEFAULT_PAYLOAD_TEMPLATE: &str = r#"{
  "archive_url": {{ archive_url | json_encode | safe }},
  "docker_tags": [{{ tag | json_encode | safe }}],
  "pull_robot": {{ pull_robot | json_encode | safe }}
}
"#;

/// A build to trigger on the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// `org/repo` on the registry.
    pub repository: String,
    /// URL of the Dockerfile (or build context archive) to build.
    pub dockerfile_url: String,
    pub tag: String,
    pub pull_robot: String,
}

/// Render the payload `template` for `request`.
pub fn render_payload(template: &str, request: &BuildRequest) -> Result<String, PayloadError> {
    let mut context = Context::new();
    context.insert("archive_url", &request.dockerfile_url);
    context.insert("tag", &request.tag);
    context.insert("pull_robot", &request.pull_robot);

    Tera::one_off(template, &context, false).map_err(|e| PayloadError::Render { source: e })
}

/// Read a payload template from disk.
pub fn load_payload_template(path: &Path) -> Result<String, PayloadError> {
    std::fs::read_to_string(path).map_err(|e| PayloadError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("failed to read payload template {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to render build payload")]
    Render { source: tera::Error },
}
