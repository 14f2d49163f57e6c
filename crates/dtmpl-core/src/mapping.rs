use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::target::Variant;

/// Concrete versions per variant, expanded from the `mapping` config section.
///
/// | config value | meaning |
/// |--------------|---------|
/// | key absent   | variant applies to every resolved version |
/// | `null`       | variant applies to no version |
/// | `[]`         | ignored, same as absent |
/// | `[globs..]`  | variant applies to the glob expansions, in pattern order |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<Variant, Option<Vec<String>>>,
}

/// Result of a [`MappingTable::versions_for`] lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelection<'a> {
    Versions(&'a [String]),
    /// The variant is mapped to `null`; process nothing.
    Skip,
}

impl MappingTable {
    /// Expand every glob in `raw` against `workdir`.
    ///
    /// Expansions are concatenated in pattern order and not deduplicated.
    pub fn build(
        workdir: &Path,
        raw: &BTreeMap<String, Option<Vec<String>>>,
    ) -> crate::Result<Self> {
        let mut entries = HashMap::new();
        for (name, patterns) in raw {
            let variant = Variant::new(name.as_str());
            match patterns {
                None => {
                    entries.insert(variant, None);
                }
                Some(patterns) if patterns.is_empty() => {}
                Some(patterns) => {
                    let mut versions = Vec::new();
                    for pattern in patterns {
                        versions.extend(crate::dirglob(workdir, pattern)?);
                    }
                    entries.insert(variant, Some(versions));
                }
            }
        }

        tracing::debug!(mapping = ?entries, "mapping after globbing");
        Ok(Self { entries })
    }

    pub fn versions_for<'a>(
        &'a self,
        variant: &Variant,
        default_versions: &'a [String],
    ) -> VersionSelection<'a> {
        match self.entries.get(variant) {
            None => VersionSelection::Versions(default_versions),
            Some(None) => VersionSelection::Skip,
            Some(Some(versions)) => VersionSelection::Versions(versions),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
