use std::path::Path;

use dtmpl_build::{DjinjaRenderer, Outcome, ReconcileEngine, ReconcileOptions};
use dtmpl_core::{
    CliOverrides, MappingTable, Settings, TemplateConfig, resolve_variants, resolve_versions,
};

/// Render every mapped (version, variant) pair and bring the Dockerfiles up to date.
pub async fn update(
    workdir: &Path,
    config_path: Option<&Path>,
    overrides: CliOverrides,
    engine: &str,
) -> anyhow::Result<()> {
    let file = TemplateConfig::load(workdir, config_path)?;
    let settings = Settings::resolve(workdir, file, overrides)?;
    tracing::debug!(?settings, "resolved settings");

    let versions = resolve_versions(workdir, &settings.versions, &settings.skip_versions)?;
    let variants = resolve_variants(workdir, &settings.variants)?;
    let mapping = MappingTable::build(workdir, &settings.mapping)?;

    if variants.is_empty() {
        tracing::info!("No templates found in {}", workdir.display());
        return Ok(());
    }

    let renderer =
        DjinjaRenderer::new(workdir, &settings.render_context())?.with_engine(engine);
    let engine = ReconcileEngine::new(
        renderer,
        ReconcileOptions {
            workdir: workdir.to_path_buf(),
            image: settings.image(),
            quiet: settings.quiet,
            dry_run: settings.dry_run,
        },
    );

    let report = engine.run(&versions, &variants, &mapping).await?;

    let updated = report.count(Outcome::Updated);
    let unchanged = report.count(Outcome::Unchanged);
    let skipped = report.count(Outcome::SkippedNoMapping);
    if settings.dry_run {
        tracing::info!("{updated} would be updated, {unchanged} unchanged, {skipped} variant(s) skipped (dry-run)");
    } else {
        tracing::info!("{updated} updated, {unchanged} unchanged, {skipped} variant(s) skipped");
    }
    Ok(())
}
