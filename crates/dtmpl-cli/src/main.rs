mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dtmpl",
    about = "Render versioned Dockerfiles from templates and drive registry builds"
)]
#[command(version)]
struct Cli {
    /// Show debug output (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate <version>/<variant>/Dockerfile from the templates
    Update {
        /// Only print the paths of updated Dockerfiles
        #[arg(long, short = 'q')]
        quiet: bool,
        /// Show what would change without writing anything
        #[arg(long, short = 'd')]
        dry_run: bool,
        /// Extra template variable (KEY=VALUE), repeatable
        #[arg(long = "env", short = 'e', value_name = "KEY=VALUE")]
        env: Vec<String>,
        /// Glob of version directories to skip, repeatable
        #[arg(long = "skip-version", short = 's', value_name = "GLOB")]
        skip_versions: Vec<String>,
        /// Configuration file [default: docker-template.yaml]
        #[arg(long, short = 'c')]
        config_path: Option<PathBuf>,
        /// Template engine command line
        #[arg(long, env = "DTMPL_DJ", default_value = dtmpl_build::renderer::DEFAULT_ENGINE)]
        engine: String,
        /// Versions to render (default: every version directory)
        versions: Vec<String>,
        /// Variants to render, after `--` (default: every template)
        #[arg(last = true)]
        variants: Vec<String>,
    },
    /// List Dockerfiles changed in a git revision range
    Changed {
        /// e.g. HEAD~1 or v1..v2
        revision_range: String,
        /// Variant precedence, after `--`; `_default` is the default variant
        #[arg(last = true)]
        variants: Vec<String>,
    },
    /// Trigger a container registry build
    Trigger {
        /// Repository as org/repo
        #[arg(long, short = 'r')]
        repository: String,
        /// URL of the Dockerfile to build
        #[arg(long, short = 'd')]
        dockerfile: String,
        /// Image tag
        #[arg(long, short = 't')]
        tag: String,
        /// Robot account allowed to pull base images
        #[arg(long, short = 'p')]
        pull_robot: String,
        /// Registry host
        #[arg(long, default_value = dtmpl_ci::DEFAULT_REGISTRY)]
        registry: String,
        /// Custom request body template
        #[arg(long)]
        payload_template: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("invalid {}: {e}", EnvFilter::DEFAULT_ENV))?
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        // arch-lint: allow(no-error-swallowing) reason=".env is optional; the access token may come from the real environment"
        Err(e) if e.not_found() => tracing::debug!("no .env file"),
        Err(e) => anyhow::bail!("failed to load .env: {e}"),
    }

    let workdir = std::env::current_dir()?;

    match cli.command {
        Commands::Update {
            quiet,
            dry_run,
            env,
            skip_versions,
            config_path,
            engine,
            versions,
            variants,
        } => {
            let overrides = dtmpl_core::CliOverrides {
                quiet,
                dry_run,
                versions,
                variants,
                skip_versions,
                env,
            };
            commands::update(&workdir, config_path.as_deref(), overrides, &engine).await?
        }
        Commands::Changed {
            revision_range,
            variants,
        } => commands::changed(&workdir, &revision_range, &variants).await?,
        Commands::Trigger {
            repository,
            dockerfile,
            tag,
            pull_robot,
            registry,
            payload_template,
        } => {
            let request = dtmpl_ci::BuildRequest {
                repository,
                dockerfile_url: dockerfile,
                tag,
                pull_robot,
            };
            commands::trigger(&request, &registry, payload_template.as_deref()).await?
        }
    }

    Ok(())
}
