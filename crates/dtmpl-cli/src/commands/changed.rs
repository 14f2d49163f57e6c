use std::path::Path;

use dtmpl_ci::{ChangedDockerfiles, RealGit, order_by_variant};
use dtmpl_core::Variant;

/// Print the Dockerfiles changed in `revision_range`, one per line.
///
/// With a non-empty `variants` precedence list the output is ordered so that
/// base variants come before the variants built on top of them.
pub async fn changed(
    workdir: &Path,
    revision_range: &str,
    variants: &[String],
) -> anyhow::Result<()> {
    let mut git = RealGit::new(workdir);
    if let Some(binary) = std::env::var_os("GIT") {
        git = git.with_binary(binary.to_string_lossy());
    }

    let lister = ChangedDockerfiles::with_executor(git);
    let mut paths = lister.list_changed(revision_range).await?;

    if paths.is_empty() {
        tracing::info!("No dockerfiles have been updated!");
        return Ok(());
    }

    if !variants.is_empty() {
        let priority: Vec<Variant> = variants.iter().map(|v| Variant::new(v.as_str())).collect();
        paths = order_by_variant(paths, &priority)?;
    }

    for path in &paths {
        println!("{path}");
    }
    Ok(())
}
