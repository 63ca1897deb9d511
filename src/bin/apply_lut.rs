use anyhow::{Context, Result};
use clap::Parser;
use lutfilters::image_handler;
use lutfilters::lut3d::{CubeLut, ParseMode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Apply a `.cube` LUT to a single image.
#[derive(Parser)]
#[command(name = "apply_lut", version)]
struct Args {
    /// The `.cube` file to apply
    cube: PathBuf,
    /// Source image
    input: PathBuf,
    /// Where to write the graded image; the format follows the extension
    output: PathBuf,
    /// Reject LUT files with lines that would otherwise be skipped
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mode = if args.strict {
        ParseMode::Strict
    } else {
        ParseMode::Permissive
    };
    let lut = CubeLut::from_cube_with(&args.cube, mode)
        .with_context(|| format!("loading {}", args.cube.display()))?;
    image_handler::apply_to_file(&args.input, &args.output, &lut).with_context(|| {
        format!("applying {} to {}", args.cube.display(), args.input.display())
    })?;

    info!(
        "Applied {} to {} → {}",
        args.cube.display(),
        args.input.display(),
        args.output.display()
    );
    Ok(())
}
