//! Standalone binary for generating synthetic images
//!
//! Usage:
//!   cargo run --bin generate_samples -- --checkpoints checkpoints --num-samples 64

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rust_dcgan_images::{
    data::save_grid,
    utils::{find_latest_checkpoint, list_checkpoints, model_from_checkpoint, setup_logging},
};

/// Generate images using a trained DCGAN
#[derive(Parser)]
#[command(name = "generate_samples")]
#[command(about = "Generate image grids from DCGAN checkpoints")]
struct Args {
    /// Directory holding checkpoint_epoch_* subdirectories
    #[arg(short, long, default_value = "checkpoints")]
    checkpoints: String,

    /// Specific checkpoint directory (defaults to the latest one)
    #[arg(short, long)]
    model: Option<String>,

    /// Number of images per grid
    #[arg(short, long, default_value = "64")]
    num_samples: i64,

    /// Output PNG file
    #[arg(short, long, default_value = "generated.png")]
    output: String,

    /// One grid per checkpoint, written next to `output`
    #[arg(long)]
    all: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<i64>,

    /// Use GPU if available
    #[arg(long)]
    gpu: bool,
}

fn main() -> Result<()> {
    setup_logging("info")?;

    let args = Args::parse();

    let device = if args.gpu && tch::Cuda::is_available() {
        info!("Using CUDA GPU");
        tch::Device::Cuda(0)
    } else {
        info!("Using CPU");
        tch::Device::Cpu
    };

    let nrow = (args.num_samples as f64).sqrt().ceil() as i64;
    let output = PathBuf::from(&args.output);

    if args.all {
        let checkpoints = list_checkpoints(&args.checkpoints);
        if checkpoints.is_empty() {
            anyhow::bail!("no checkpoints under {}", args.checkpoints);
        }

        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("generated")
            .to_string();

        for (path, meta) in checkpoints {
            // Same latents for every checkpoint
            if let Some(seed) = args.seed {
                tch::manual_seed(seed);
            }
            let model = model_from_checkpoint(&path, device)?;
            let samples = model.generate(args.num_samples);
            let target = output.with_file_name(format!("{}_epoch_{:04}.png", stem, meta.epoch));
            save_grid(&samples, &target, nrow)?;
            info!(
                "Epoch {} (G_loss {:.4}, D_loss {:.4}) -> {}",
                meta.epoch,
                meta.gen_loss,
                meta.disc_loss,
                target.display()
            );
        }
        return Ok(());
    }

    let checkpoint = match args.model {
        Some(path) => PathBuf::from(path),
        None => find_latest_checkpoint(&args.checkpoints)
            .with_context(|| format!("no checkpoints under {}", args.checkpoints))?,
    };

    if let Some(seed) = args.seed {
        tch::manual_seed(seed);
    }

    info!("Loading generator from {}", checkpoint.display());
    let model = model_from_checkpoint(&checkpoint, device)?;

    let samples = model.generate(args.num_samples);
    save_grid(&samples, &output, nrow)?;
    info!("Saved {} images to {}", args.num_samples, output.display());

    Ok(())
}
