use anyhow::{Context, Result};
use clap::Parser;
use lutfilters::config::Config;
use lutfilters::image_handler;
use lutfilters::lut3d::ParseMode;
use lutfilters::preset::{self, PresetCatalog};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Grade every image in a directory with a `.cube` preset.
#[derive(Parser)]
#[command(name = "lutfilters", version)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(default_value = "config.toml")]
    config: PathBuf,
}

/// Sets up logging; `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Batch entry point.
///
/// Reads the config, loads the selected preset once, and grades every image
/// in the input directory into the output directory. A bad image only fails that image; a bad config or
/// LUT stops the run before anything is written.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config_path = cli.config;
    let cfg = Config::load(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    if cfg.processing.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.processing.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let catalog = PresetCatalog::from_config(&cfg);
    let available = preset::discover(catalog.lut_dir());
    info!(dir = %catalog.lut_dir().display(), count = available.len(), "LUT files available");

    let mode = if cfg.lut.strict {
        ParseMode::Strict
    } else {
        ParseMode::Permissive
    };
    let lut = catalog.load(&cfg.lut.selected, mode).inspect_err(|_| {
        let known: Vec<&str> = catalog.names().collect();
        error!(preset = %cfg.lut.selected, ?known, "cannot load preset");
    })?;
    info!(preset = %cfg.lut.selected, size = lut.size(), "using preset");

    let summary = image_handler::process_images(&cfg.input.image_dir, &cfg.input.output, &lut)
        .with_context(|| format!("processing {}", cfg.input.image_dir.display()))?;

    println!(
        "Graded {} image(s) into {} ({} failed, {} skipped)",
        summary.processed,
        cfg.input.output.display(),
        summary.failed,
        summary.skipped
    );
    Ok(())
}
