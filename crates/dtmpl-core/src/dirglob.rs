//! Shell-style globbing relative to a working directory.

use std::path::Path;

use glob::{MatchOptions, Pattern};

/// Shell semantics: `*` never crosses `/` and never matches a leading dot.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Expand `pattern` inside `workdir` and return the matching entries as paths
/// relative to `workdir`, in sorted order.
///
/// A pattern that matches nothing (including a literal name that does not
/// exist) expands to an empty list, like `ls -1d <pattern>` failing.
pub fn dirglob(workdir: &Path, pattern: &str) -> crate::Result<Vec<String>> {
    let root = workdir
        .to_str()
        .ok_or_else(|| crate::Error::NonUtf8Path(workdir.to_path_buf()))?;
    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_owned()
    } else {
        format!("{}/{pattern}", Pattern::escape(root.trim_end_matches('/')))
    };

    let entries =
        glob::glob_with(&full_pattern, MATCH_OPTIONS).map_err(|e| crate::Error::InvalidGlob {
            pattern: pattern.to_owned(),
            source: e,
        })?;

    let mut matches = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| crate::Error::GlobEntry {
            pattern: pattern.to_owned(),
            source: e,
        })?;
        // arch-lint: allow(no-silent-result-drop) reason="matches of an absolute pattern lie outside workdir and are kept as given"
        let relative = path.strip_prefix(workdir).unwrap_or(&path);
        matches.push(relative.to_string_lossy().into_owned());
    }

    tracing::debug!(pattern, ?matches, "glob expanded");
    Ok(matches)
}
