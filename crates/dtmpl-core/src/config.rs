use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Config file looked up in the working directory when `-c` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "docker-template.yaml";

/// docker-template.yaml configuration
///
/// Every field is optional; absent fields fall back to CLI values or defaults
/// during [`Settings::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateConfig {
    /// Variant → version globs. A `null` value excludes the variant entirely.
    pub mapping: Option<BTreeMap<String, Option<Vec<String>>>>,
    /// Datasource settings handed to the templating engine verbatim.
    pub datasources: Option<Mapping>,
    /// Report only the paths of updated Dockerfiles, not their diffs.
    pub quiet: Option<bool>,
    /// Report changes without writing them.
    pub dry_run: Option<bool>,
    pub versions: Option<Vec<String>>,
    pub variants: Option<Vec<String>>,
    /// Globs of versions that are never generated.
    pub skip_version: Option<Vec<String>>,
    /// Extra render variables, merged into the engine config blob.
    pub env: Option<BTreeMap<String, Value>>,
}

impl TemplateConfig {
    /// Load the YAML config.
    ///
    /// With `config_path == None` the default `docker-template.yaml` is tried
    /// and defaults are returned if it does not exist. An explicitly requested
    /// file must exist.
    pub fn load(workdir: &Path, config_path: Option<&Path>) -> crate::Result<Self> {
        let (path, required) = match config_path {
            Some(path) => (workdir.join(path), true),
            None => (workdir.join(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| crate::Error::ConfigLoad {
            path: path.clone(),
            source: e,
        })?;
        Self::parse(&content).map_err(|e| crate::Error::ConfigParse { path, source: e })
    }

    /// Parse YAML text; an empty document yields the defaults.
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Values given on the command line. Empty lists and unset flags mean
/// "not given" and defer to the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub quiet: bool,
    pub dry_run: bool,
    pub versions: Vec<String>,
    pub variants: Vec<String>,
    pub skip_versions: Vec<String>,
    /// Raw `key=value` arguments.
    pub env: Vec<String>,
}

/// Effective settings for one run, after merging CLI over file over defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub workdir: PathBuf,
    pub quiet: bool,
    pub dry_run: bool,
    pub versions: Vec<String>,
    pub variants: Vec<String>,
    pub skip_versions: Vec<String>,
    pub mapping: BTreeMap<String, Option<Vec<String>>>,
    pub datasources: Mapping,
    pub env: BTreeMap<String, Value>,
}

impl Settings {
    /// Merge field by field:
    ///
    /// - flags: set on the CLI wins, else the file value, else `false`
    /// - `versions`/`variants`: a non-empty CLI list replaces the file list
    /// - `skip-version`: file and CLI globs are both applied
    /// - `env`: CLI keys replace file keys of the same name
    pub fn resolve(
        workdir: impl Into<PathBuf>,
        file: TemplateConfig,
        cli: CliOverrides,
    ) -> crate::Result<Self> {
        let cli_env = parse_env_args(&cli.env)?;

        // arch-lint: allow(no-silent-result-drop) reason="an absent env section means no file-level variables"
        let mut env = file.env.unwrap_or_default();
        env.extend(cli_env.into_iter().map(|(k, v)| (k, Value::String(v))));

        // arch-lint: allow(no-silent-result-drop) reason="an absent skip-version section skips nothing"
        let mut skip_versions = file.skip_version.unwrap_or_default();
        skip_versions.extend(cli.skip_versions);

        // arch-lint: allow(no-silent-result-drop) reason="an absent mapping section maps every variant to all versions"
        let mapping = file.mapping.unwrap_or_default();
        // arch-lint: allow(no-silent-result-drop) reason="datasources default to an empty map in the engine config"
        let datasources = file.datasources.unwrap_or_default();

        Ok(Self {
            workdir: workdir.into(),
            quiet: cli.quiet || file.quiet == Some(true),
            dry_run: cli.dry_run || file.dry_run == Some(true),
            versions: prefer_cli(cli.versions, file.versions),
            variants: prefer_cli(cli.variants, file.variants),
            skip_versions,
            mapping,
            datasources,
            env,
        })
    }

    /// The `image` render variable: an `image` env entry, else the working
    /// directory's base name.
    pub fn image(&self) -> String {
        match self.env.get("image") {
            Some(value) => scalar_to_string(value),
            None => match self.workdir.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => String::new(),
            },
        }
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext {
            datasources: self.datasources.clone(),
            env: self.env.clone(),
        }
    }
}

/// Variables shared by every render in a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    pub datasources: Mapping,
    pub env: BTreeMap<String, Value>,
}

impl RenderContext {
    /// The engine config document: `datasources` plus every env entry at top level.
    ///
    /// An env entry named `datasources` replaces the configured datasources.
    pub fn config_blob(&self) -> Value {
        let mut blob = Mapping::new();
        blob.insert(
            Value::String("datasources".to_owned()),
            Value::Mapping(self.datasources.clone()),
        );
        for (key, value) in &self.env {
            blob.insert(Value::String(key.clone()), value.clone());
        }
        Value::Mapping(blob)
    }
}

/// Split `key=value` arguments into a map.
///
/// Each argument must contain exactly one `=` and a non-empty key.
pub fn parse_env_args(args: &[String]) -> crate::Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for arg in args {
        let malformed = || crate::Error::MalformedEnv { arg: arg.clone() };
        let (key, value) = arg.split_once('=').ok_or_else(malformed)?;
        if key.is_empty() || value.contains('=') {
            return Err(malformed());
        }
        env.insert(key.to_owned(), value.to_owned());
    }
    tracing::debug!(?env, "parsed env arguments");
    Ok(env)
}

fn prefer_cli(cli: Vec<String>, file: Option<Vec<String>>) -> Vec<String> {
    match file {
        Some(file) if cli.is_empty() => file,
        _ => cli,
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => match serde_yaml::to_string(other) {
            Ok(s) => s.trim_end().to_owned(),
            Err(e) => {
                tracing::warn!(error = %e, "cannot render image value, using empty image");
                String::new()
            }
        },
    }
}
