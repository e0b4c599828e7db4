//! DCGAN on Image Folders
//!
//! Main entry point providing CLI interface for:
//! - Inspecting the networks (graph scan, tensor printing, assertions)
//! - Overfitting a single mini-batch as a sanity check
//! - Training the DCGAN model
//! - Generating and interpolating samples

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tch::{Device, Kind, Tensor};
use tracing::{info, warn};

use rust_dcgan_images::{
    data::{
        batch_to_tensor, make_grid, normalize_to_unit, save_grid, save_image, DataLoader, ImageFolder,
    },
    inspect::{assert_finite, assert_range, assert_shape, model_summary, print_tensor, TracingInspector},
    model::{DCGAN, IMAGE_SIZE},
    training::{overfit_batch, Trainer},
    utils::{
        find_latest_checkpoint, load_checkpoint, model_from_checkpoint, setup_logging, write_default_config,
        Config,
    },
};

/// DCGAN for image folders
#[derive(Parser)]
#[command(name = "dcgan_images")]
#[command(version = "0.1.0")]
#[command(about = "Build, debug and train a DCGAN on a directory of images")]
struct Cli {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, default_value = "config.json")]
    config: String,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize default configuration file
    Init {
        /// Output configuration file path
        #[arg(short, long, default_value = "config.json")]
        output: String,
    },

    /// Scan both networks and check one forward pass
    Inspect {
        /// Image folder to draw a real batch from (defaults to config dataroot)
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Overfit a single mini-batch to check the training wiring
    Overfit {
        /// Image folder (defaults to config dataroot)
        #[arg(short, long)]
        data: Option<String>,

        /// Number of steps (defaults to config debug.overfit_steps)
        #[arg(short, long)]
        steps: Option<usize>,
    },

    /// Train the DCGAN model
    Train {
        /// Image folder (defaults to config dataroot)
        #[arg(short, long)]
        data: Option<String>,

        /// Number of epochs (defaults to config training.epochs)
        #[arg(short, long)]
        epochs: Option<usize>,

        /// Resume from a checkpoint directory, or "latest"
        #[arg(long)]
        resume: Option<String>,
    },

    /// Generate a grid of synthetic images
    Generate {
        /// Checkpoint directory
        #[arg(short, long)]
        model: String,

        /// Number of images to generate
        #[arg(short, long, default_value = "64")]
        num_samples: i64,

        /// Output PNG file
        #[arg(short, long, default_value = "generated.png")]
        output: String,

        /// Also write every image to this directory
        #[arg(long)]
        individual: Option<String>,
    },

    /// Walk the latent space between two random points
    Interpolate {
        /// Checkpoint directory
        #[arg(short, long)]
        model: String,

        /// Number of interpolation steps
        #[arg(short, long, default_value = "10")]
        steps: i64,

        /// Output PNG file
        #[arg(short, long, default_value = "interpolation.png")]
        output: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity)?;

    match cli.command {
        Commands::Init { output } => init_config(&output)?,
        Commands::Inspect { data } => inspect_model(&cli.config, data)?,
        Commands::Overfit { data, steps } => overfit(&cli.config, data, steps)?,
        Commands::Train {
            data,
            epochs,
            resume,
        } => train_model(&cli.config, data, epochs, resume)?,
        Commands::Generate {
            model,
            num_samples,
            output,
            individual,
        } => generate_samples(&cli.config, &model, num_samples, &output, individual)?,
        Commands::Interpolate {
            model,
            steps,
            output,
        } => interpolate(&cli.config, &model, steps, &output)?,
    }

    Ok(())
}

/// Load config, apply the seed and pick a device
fn setup(config_path: &str) -> Result<(Config, Device)> {
    let config = Config::load_or_default(config_path)?;

    if let Some(seed) = config.training.seed {
        tch::manual_seed(seed as i64);
        info!("Random seed: {}", seed);
    }

    let device = config.get_device();
    info!("Using device: {:?}", device);
    Ok((config, device))
}

fn build_model(config: &Config, device: Device) -> DCGAN {
    DCGAN::with_defaults(
        config.model.latent_dim,
        config.model.gen_base_filters,
        config.model.disc_base_filters,
        config.model.channels,
        device,
    )
}

fn open_loader(config: &Config, data: Option<String>) -> Result<DataLoader> {
    let root = data.unwrap_or_else(|| config.data.dataroot.clone());
    info!("Loading images from {}", root);

    let dataset = ImageFolder::open(&root, config.transform())
        .with_context(|| format!("failed to open image folder {root}"))?;
    info!("Found {} images in {} classes", dataset.len(), dataset.classes().len());

    let mut loader = DataLoader::new(dataset, config.data.batch_size, config.data.shuffle, true)
        .with_workers(config.data.workers)?;
    if let Some(seed) = config.training.seed {
        loader = loader.with_seed(seed);
    }
    Ok(loader)
}

fn inspector_for(config: &Config) -> TracingInspector {
    TracingInspector {
        every: config.debug.inspect_every,
        fail_on_non_finite: config.debug.fail_on_non_finite,
        check_grads: config.debug.check_grads,
    }
}

/// Print the graph scan of both networks and check one forward pass
fn inspect_model(config_path: &str, data: Option<String>) -> Result<()> {
    let (config, device) = setup(config_path)?;
    let model = build_model(&config, device);

    info!("\n{}", model_summary("Generator", &model.gen_vs));
    info!("\n{}", model_summary("Discriminator", &model.disc_vs));

    let channels = model.channels();

    let fake = model.generate(config.data.batch_size as i64);
    print_tensor("G(z)", &fake);
    assert_shape("G(z)", &fake, &[-1, channels, IMAGE_SIZE, IMAGE_SIZE])?;
    assert_range("G(z)", &fake, -1.0, 1.0)?;

    let fake_probs = model.discriminate(&fake);
    print_tensor("D(G(z))", &fake_probs);
    assert_range("D(G(z))", &fake_probs, 0.0, 1.0)?;

    let wants_real = data.is_some() || Path::new(&config.data.dataroot).is_dir();
    if wants_real {
        let mut loader = open_loader(&config, data)?;
        match loader.next_batch()? {
            Some(batch) => {
                let real = batch_to_tensor(&batch, device);
                print_tensor("x", &real);
                assert_shape("x", &real, &[-1, channels, IMAGE_SIZE, IMAGE_SIZE])?;
                assert_finite("x", &real)?;
                assert_range("x", &real, -1.0, 1.0)?;

                let real_probs = model.discriminate(&real);
                print_tensor("D(x)", &real_probs);
            }
            None => warn!("Dataset smaller than one batch; skipped real-batch checks"),
        }
    } else {
        info!("No image folder available; skipped real-batch checks");
    }

    info!("All inspection checks passed");
    Ok(())
}

/// Overfit a single batch
fn overfit(config_path: &str, data: Option<String>, steps: Option<usize>) -> Result<()> {
    let (config, device) = setup(config_path)?;
    let mut model = build_model(&config, device);
    let mut loader = open_loader(&config, data)?;

    let batch = loader
        .next_batch()?
        .context("dataset smaller than one batch")?;
    let batch = batch_to_tensor(&batch, device);

    let mut overfit_config = config.overfit_config();
    if let Some(steps) = steps {
        overfit_config.steps = steps;
    }

    let report = overfit_batch(&mut model, &batch, &overfit_config, &mut inspector_for(&config))?;

    if let Some(last) = report.last() {
        info!(
            "Final: Loss_D={:.4} Loss_G={:.4} D(x)={:.4} D(G(z))={:.4}",
            last.d_loss, last.g_loss, last.d_x, last.d_g_z2
        );
    }

    if !report.discriminator_memorized() {
        anyhow::bail!("discriminator failed to overfit a single batch");
    }
    Ok(())
}

/// Train the DCGAN model
fn train_model(
    config_path: &str,
    data: Option<String>,
    epochs: Option<usize>,
    resume: Option<String>,
) -> Result<()> {
    let (config, device) = setup(config_path)?;
    let mut loader = open_loader(&config, data)?;
    let mut model = build_model(&config, device);

    let mut training_config = config.training_config();
    if let Some(epochs) = epochs {
        training_config.epochs = epochs;
    }

    let mut trainer = Trainer::new(training_config, device);

    if let Some(resume) = resume {
        let checkpoint = if resume == "latest" {
            find_latest_checkpoint(&config.training.checkpoint_dir)
                .context("no checkpoint found to resume from")?
        } else {
            PathBuf::from(resume)
        };
        let (epoch, metrics) = load_checkpoint(&mut model, &checkpoint)?;
        info!("Resumed from epoch {}", epoch);
        trainer = trainer.resume_from(epoch, metrics);
    }

    let mut inspector = inspector_for(&config);
    let metrics = trainer.train_with_inspector(&mut model, &mut loader, &mut inspector)?;

    info!(
        "Training complete. Final G_loss: {:.4}, D_loss: {:.4}",
        metrics.latest_gen_loss().unwrap_or(0.0),
        metrics.latest_disc_loss().unwrap_or(0.0)
    );

    Ok(())
}

/// Generate a grid of synthetic images
fn generate_samples(
    config_path: &str,
    model_path: &str,
    num_samples: i64,
    output: &str,
    individual: Option<String>,
) -> Result<()> {
    let (_config, device) = setup(config_path)?;
    let model = model_from_checkpoint(model_path, device)?;
    info!("Loaded model from {}", model_path);

    info!("Generating {} synthetic images", num_samples);
    let samples = model.generate(num_samples);

    let nrow = (num_samples as f64).sqrt().ceil() as i64;
    save_grid(&samples, output, nrow)?;
    info!("Saved grid to {}", output);

    if let Some(dir) = individual {
        std::fs::create_dir_all(&dir)?;
        // Map tanh output [-1, 1] back to [0, 1]
        let images = (samples.to_kind(Kind::Float) + 1.0) / 2.0;
        for i in 0..num_samples {
            let path = Path::new(&dir).join(format!("sample_{i:04}.png"));
            save_image(&images.get(i), &path)?;
        }
        info!("Saved {} images to {}", num_samples, dir);
    }

    Ok(())
}

/// Interpolate between two random latent vectors
fn interpolate(config_path: &str, model_path: &str, steps: i64, output: &str) -> Result<()> {
    let (_config, device) = setup(config_path)?;
    let model = model_from_checkpoint(model_path, device)?;

    let z1 = Tensor::randn([model.latent_dim()], (Kind::Float, device));
    let z2 = Tensor::randn([model.latent_dim()], (Kind::Float, device));

    let frames = model.interpolate(&z1, &z2, steps);
    let grid = make_grid(&normalize_to_unit(&frames), steps, 2);
    save_image(&grid, output)?;

    info!("Saved {} interpolation steps to {}", steps, output);
    Ok(())
}

/// Initialize default configuration file
fn init_config(output_path: &str) -> Result<()> {
    write_default_config(output_path)?;
    info!("Created default configuration at {}", output_path);
    Ok(())
}
