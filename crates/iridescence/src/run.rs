use anyhow::{Context, Result};
use bgconfig::BackgroundFile;
use renderer::Renderer;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::paths::AppPaths;
use crate::settings;

const DEFAULT_FILTER: &str =
    "warn,iridescence=info,renderer=info,chat=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";

pub fn run(args: RunArgs) -> Result<()> {
    let file = effective_settings(&args)?;
    let config = settings::renderer_config(&file, &args);
    tracing::info!(
        surface = %config.surface_id,
        width = config.surface_size.0,
        height = config.surface_size.1,
        policy = ?config.policy,
        "starting iridescence background"
    );
    Renderer::new(config).run()
}

/// Config file merged with command-line overrides.
pub fn effective_settings(args: &RunArgs) -> Result<BackgroundFile> {
    let paths = AppPaths::discover()?.with_config_file(args.config.as_deref());
    let path = paths.config_file();
    tracing::debug!(config = %path.display(), "loading configuration");
    let file = BackgroundFile::load(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    settings::merge_overrides(file, args)
}

pub fn initialise_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
