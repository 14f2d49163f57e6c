use std::fmt;
use std::path::PathBuf;

/// Sentinel name for the default (suffix-less) variant.
pub const DEFAULT_VARIANT_NAME: &str = "_default";

/// File name of the default variant's template. Other variants append `-<variant>`.
pub const TEMPLATE_FILE_NAME: &str = "Dockerfile.template";

/// File name of every generated Dockerfile.
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// A Dockerfile flavor, e.g. `alpine` or `slim`.
///
/// The default variant is stored as the empty string. Every constructor maps
/// the `_default` sentinel onto it, so CLI arguments, mapping keys, and
/// template file names all agree on a single representation.
///
/// ```
/// use dtmpl_core::Variant;
///
/// assert!(Variant::new("_default").is_default());
/// assert_eq!(Variant::new("").label(), "_default");
/// assert_eq!(Variant::new("alpine").template_file_name(), "Dockerfile.template-alpine");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variant(String);

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == DEFAULT_VARIANT_NAME {
            Self(String::new())
        } else {
            Self(name)
        }
    }

    /// Derive the variant from a template file name such as `Dockerfile.template-slim`.
    ///
    /// Returns `None` when the name does not start with `Dockerfile.template`.
    pub fn from_template_file_name(file_name: &str) -> Option<Self> {
        file_name
            .strip_prefix(TEMPLATE_FILE_NAME)
            .map(|suffix| Self::new(suffix.trim_matches('-')))
    }

    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    /// The directory segment for this variant; empty for the default variant.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human/engine facing name: `_default` for the default variant.
    pub fn label(&self) -> &str {
        if self.is_default() {
            DEFAULT_VARIANT_NAME
        } else {
            &self.0
        }
    }

    pub fn template_file_name(&self) -> String {
        if self.is_default() {
            TEMPLATE_FILE_NAME.to_owned()
        } else {
            format!("{TEMPLATE_FILE_NAME}-{}", self.0)
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Variant {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Variant {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A generated Dockerfile location: `<version>/<variant>/Dockerfile`, with the
/// variant segment omitted for the default variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DockerfileTarget {
    pub version: String,
    pub variant: Variant,
}

impl DockerfileTarget {
    pub fn new(version: impl Into<String>, variant: Variant) -> Self {
        Self {
            version: version.into(),
            variant,
        }
    }

    /// Path relative to the working directory.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.version);
        if !self.variant.is_default() {
            path.push(self.variant.as_str());
        }
        path.push(DOCKERFILE_NAME);
        path
    }

    /// Parse a slash-separated path such as `2.1/alpine/Dockerfile`.
    ///
    /// A path with a single directory segment belongs to the default variant.
    pub fn parse(path: &str) -> crate::Result<Self> {
        let invalid = |reason| crate::Error::InvalidTarget {
            path: path.to_owned(),
            reason,
        };

        let dir = path
            .strip_suffix(DOCKERFILE_NAME)
            .and_then(|rest| rest.strip_suffix('/'))
            .ok_or_else(|| invalid("expected a path ending in /Dockerfile"))?;

        let segments: Vec<&str> = dir.split('/').collect();
        match segments.as_slice() {
            [version] if !version.is_empty() => Ok(Self::new(*version, Variant::default())),
            [version, variant] if !version.is_empty() && !variant.is_empty() => {
                Ok(Self::new(*version, Variant::new(*variant)))
            }
            [_, _] | [_] => Err(invalid("empty path segment")),
            _ => Err(invalid("too many path segments")),
        }
    }
}

impl fmt::Display for DockerfileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant.is_default() {
            write!(f, "{}/{DOCKERFILE_NAME}", self.version)
        } else {
            write!(f, "{}/{}/{DOCKERFILE_NAME}", self.version, self.variant.as_str())
        }
    }
}
