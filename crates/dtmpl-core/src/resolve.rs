//! Which versions and variants a run processes.

use std::path::Path;

use crate::target::{TEMPLATE_FILE_NAME, Variant};

/// Versions to process, in order and without duplicates.
///
/// A non-empty `cli_versions` is authoritative; otherwise every immediate,
/// non-hidden subdirectory of `workdir` is a version. Every expansion of
/// `skip_patterns` is removed from the result.
pub fn resolve_versions(
    workdir: &Path,
    cli_versions: &[String],
    skip_patterns: &[String],
) -> crate::Result<Vec<String>> {
    let candidates = if cli_versions.is_empty() {
        version_directories(workdir)?
    } else {
        tracing::debug!("version list overridden from CLI");
        cli_versions.to_vec()
    };

    let mut skipped = Vec::new();
    for pattern in skip_patterns {
        skipped.extend(crate::dirglob(workdir, pattern)?);
    }

    let mut versions: Vec<String> = Vec::with_capacity(candidates.len());
    for version in candidates {
        if !skipped.contains(&version) && !versions.contains(&version) {
            versions.push(version);
        }
    }

    tracing::debug!(?versions, ?skipped, "target versions");
    Ok(versions)
}

/// Variants to process.
///
/// A non-empty `cli_variants` is authoritative; otherwise each
/// `Dockerfile.template*` file in `workdir` names one variant. `_default`
/// becomes the default variant in both cases.
pub fn resolve_variants(workdir: &Path, cli_variants: &[String]) -> crate::Result<Vec<Variant>> {
    let variants = if cli_variants.is_empty() {
        template_variants(workdir)?
    } else {
        tracing::debug!("variant list overridden from CLI");
        cli_variants.iter().map(|v| Variant::new(v.as_str())).collect()
    };

    tracing::debug!(?variants, "target variants");
    Ok(variants)
}

fn version_directories(workdir: &Path) -> crate::Result<Vec<String>> {
    let mut versions: Vec<String> = list_dir(workdir)?
        .into_iter()
        .filter(|(name, path)| !name.starts_with('.') && path.is_dir())
        .map(|(name, _)| name)
        .collect();
    versions.sort();
    Ok(versions)
}

fn template_variants(workdir: &Path) -> crate::Result<Vec<Variant>> {
    let mut names: Vec<String> = list_dir(workdir)?
        .into_iter()
        .filter(|(name, path)| name.starts_with(TEMPLATE_FILE_NAME) && path.is_file())
        .map(|(name, _)| name)
        .collect();
    names.sort();
    Ok(names
        .iter()
        .filter_map(|name| Variant::from_template_file_name(name))
        .collect())
}

fn list_dir(dir: &Path) -> crate::Result<Vec<(String, std::path::PathBuf)>> {
    let read_err = |e| crate::Error::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        entries.push((name, entry.path()));
    }
    Ok(entries)
}
