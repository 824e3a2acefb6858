//! satseg CLI - segment clouds in a four-band satellite scene.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use satseg::image::DEFAULT_THRESHOLD;
use satseg::{Config, Pipeline};

/// Run a cloud segmentation model over a folder of PNG bands and write a mask.
#[derive(Parser, Debug)]
#[command(name = "satseg")]
#[command(version, about, long_about = None)]
struct Args {
    /// Folder holding one PNG per band.
    #[arg(short, long, default_value_os_t = Config::default().input_dir, value_name = "DIR")]
    input_dir: PathBuf,

    /// ONNX model path.
    #[arg(short, long, default_value_os_t = Config::default().model_path, value_name = "FILE")]
    model: PathBuf,

    /// Output mask path.
    #[arg(short, long, default_value_os_t = Config::default().output_path, value_name = "FILE")]
    output: PathBuf,

    /// Probability threshold (0.0-1.0) at or above which a pixel is cloud.
    #[arg(short, long, default_value_t = DEFAULT_THRESHOLD, value_name = "FLOAT")]
    threshold: f32,

    /// Write 0/1 samples instead of 0/255.
    #[arg(long)]
    raw_mask: bool,

    /// Intra-op threads for the inference session.
    #[arg(long, default_value_t = Config::default().intra_threads, value_name = "INT")]
    threads: usize,

    /// Band file prefixes in model channel order, e.g. red,green,blue,nir.
    #[arg(long, value_delimiter = ',', value_name = "PREFIX,...")]
    band_order: Option<Vec<String>>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("satseg={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(args) {
        tracing::error!("Fatal error: {err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: Args) -> Result<()> {
    if !args.input_dir.is_dir() {
        anyhow::bail!("Input folder does not exist: {}", args.input_dir.display());
    }

    let config = Config {
        input_dir: args.input_dir,
        model_path: args.model,
        output_path: args.output,
        threshold: args.threshold,
        normalize: !args.raw_mask,
        intra_threads: args.threads,
        band_order: args.band_order,
        ..Config::default()
    };

    let mut pipeline = Pipeline::new(config).context("Failed to initialize pipeline")?;

    let summary = pipeline.run().context("Failed to segment scene")?;

    println!(
        "Segmented {} bands -> {}",
        summary.bands.len(),
        summary.output_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let args = Args::parse_from(["satseg"]);
        let config = Config::default();

        assert_eq!(args.input_dir, config.input_dir);
        assert_eq!(args.model, config.model_path);
        assert_eq!(args.output, config.output_path);
        assert!((args.threshold - config.threshold).abs() < f32::EPSILON);
        assert_eq!(args.threads, config.intra_threads);
        assert!(!args.raw_mask);
        assert!(args.band_order.is_none());
    }

    #[test]
    fn test_band_order_splits_on_commas() {
        let args = Args::parse_from(["satseg", "--band-order", "red,green,blue,nir"]);
        assert_eq!(
            args.band_order.as_deref(),
            Some(&["red", "green", "blue", "nir"].map(String::from)[..])
        );
    }
}
