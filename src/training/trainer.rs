//! Training loop implementation for DCGAN
//!
//! Provides the main training loop with alternating updates
//! for discriminator and generator.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tch::{Device, Tensor};
use tracing::{info, warn};

use super::metrics::{EmaTracker, TrainingMetrics};
use super::step::adversarial_step;
use crate::data::{batch_to_tensor, save_grid, DataLoader};
use crate::inspect::{NoopInspector, StepInspector};
use crate::model::DCGAN;
use crate::utils::save_checkpoint;

/// Training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Adam learning rate for both networks
    pub lr: f64,
    /// Adam beta1 for both networks
    pub beta1: f64,
    /// Target for real images in the discriminator loss (1.0 = no smoothing)
    pub real_label: f64,
    /// Log every N steps
    pub log_every: usize,
    /// Save a grid of fixed-noise samples every N steps (0 = only per epoch)
    pub sample_every: usize,
    /// Number of fixed latent vectors used for progress grids
    pub num_fixed_samples: i64,
    /// Save checkpoint every N epochs
    pub checkpoint_every: usize,
    /// Directory to save checkpoints
    pub checkpoint_dir: String,
    /// Directory to save sample grids
    pub sample_dir: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            lr: 2e-4,
            beta1: 0.5,
            real_label: 1.0,
            log_every: 50,
            sample_every: 500,
            num_fixed_samples: 64,
            checkpoint_every: 1,
            checkpoint_dir: "checkpoints".to_string(),
            sample_dir: "samples".to_string(),
        }
    }
}

/// DCGAN Trainer
pub struct Trainer {
    config: TrainingConfig,
    device: Device,
    metrics: TrainingMetrics,
    start_epoch: usize,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: TrainingConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
            start_epoch: 0,
        }
    }

    /// Continue from a checkpoint: epochs before `epoch` are skipped
    pub fn resume_from(mut self, epoch: usize, metrics: TrainingMetrics) -> Self {
        self.start_epoch = epoch;
        self.metrics = metrics;
        self
    }

    /// Train the DCGAN model without inspection hooks
    pub fn train(&mut self, model: &mut DCGAN, data_loader: &mut DataLoader) -> anyhow::Result<&TrainingMetrics> {
        self.train_with_inspector(model, data_loader, &mut NoopInspector)
    }

    /// Train the DCGAN model, calling `inspector` around every step
    ///
    /// # Arguments
    ///
    /// * `model` - DCGAN model to train
    /// * `data_loader` - DataLoader providing training batches
    /// * `inspector` - Hooks run before and after each adversarial step
    ///
    /// # Returns
    ///
    /// Training metrics
    pub fn train_with_inspector(
        &mut self,
        model: &mut DCGAN,
        data_loader: &mut DataLoader,
        inspector: &mut dyn StepInspector,
    ) -> anyhow::Result<&TrainingMetrics> {
        let mut gen_opt = model.gen_optimizer(self.config.lr, self.config.beta1)?;
        let mut disc_opt = model.disc_optimizer(self.config.lr, self.config.beta1)?;

        let num_batches = data_loader.num_batches();
        if num_batches == 0 {
            anyhow::bail!(
                "dataset of {} images yields no batch of size {}",
                data_loader.num_samples(),
                data_loader.batch_size()
            );
        }

        info!(
            "Starting training for {} epochs, {} batches per epoch",
            self.config.epochs, num_batches
        );

        std::fs::create_dir_all(&self.config.checkpoint_dir)?;
        std::fs::create_dir_all(&self.config.sample_dir)?;

        // Fixed noise shows the generator's progress on the same latents
        let fixed_noise = model.sample_noise(self.config.num_fixed_samples);
        let mut step = self.metrics.global_step();
        let mut d_ema = EmaTracker::new(0.1);
        let mut g_ema = EmaTracker::new(0.1);

        for epoch in self.start_epoch..self.config.epochs {
            let pb = ProgressBar::new(num_batches as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
                    .progress_chars("##-"),
            );

            for batch in data_loader.iter() {
                let real = batch_to_tensor(&batch?, self.device);
                let batch_size = real.size()[0];
                step += 1;

                inspector.before_step(step, &real, model)?;

                let noise = model.sample_noise(batch_size);
                let mut report = adversarial_step(
                    model,
                    &real,
                    &noise,
                    &mut gen_opt,
                    &mut disc_opt,
                    self.config.real_label,
                );
                report.epoch = epoch;
                report.step = step;

                inspector.after_step(&report, model)?;
                self.metrics.record_step(report);

                d_ema.update(report.d_loss);
                g_ema.update(report.g_loss);
                pb.set_message(format!("D: {:.4}, G: {:.4}", d_ema.value(), g_ema.value()));
                pb.inc(1);

                if self.config.log_every > 0 && step % self.config.log_every == 0 {
                    info!(
                        "[{}/{}][{}] Loss_D: {:.4} Loss_G: {:.4} D(x): {:.4} D(G(z)): {:.4} / {:.4}",
                        epoch + 1,
                        self.config.epochs,
                        step,
                        report.d_loss,
                        report.g_loss,
                        report.d_x,
                        report.d_g_z1,
                        report.d_g_z2
                    );
                }

                if self.config.sample_every > 0 && step % self.config.sample_every == 0 {
                    self.save_samples(model, &fixed_noise, format!("step_{step:07}.png"));
                }
            }

            pb.finish_with_message("done");

            if let Some((g, d, d_x, d_g_z)) = self.metrics.close_epoch(epoch) {
                info!(
                    "Epoch {}/{}: G_loss={:.4}, D_loss={:.4}, D(x)={:.4}, D(G(z))={:.4}",
                    epoch + 1,
                    self.config.epochs,
                    g,
                    d,
                    d_x,
                    d_g_z
                );
            }

            if self.metrics.check_mode_collapse(10) {
                warn!("Possible mode collapse detected! Consider adjusting learning rates.");
            }

            self.save_samples(model, &fixed_noise, format!("epoch_{:04}.png", epoch + 1));

            if self.config.checkpoint_every > 0 && (epoch + 1) % self.config.checkpoint_every == 0 {
                if let Err(e) = save_checkpoint(model, &self.metrics, epoch + 1, &self.config.checkpoint_dir) {
                    warn!("Failed to save checkpoint: {}", e);
                }
            }
        }

        let final_dir = PathBuf::from(&self.config.checkpoint_dir);
        if let Err(e) = model.save(final_dir.join("generator_final.pt"), final_dir.join("discriminator_final.pt")) {
            warn!("Failed to save final model: {}", e);
        }

        if let Err(e) = self.metrics.save_csv(final_dir.join("training_metrics.csv")) {
            warn!("Failed to save metrics: {}", e);
        }
        if let Err(e) = self.metrics.save_steps_csv(final_dir.join("training_steps.csv")) {
            warn!("Failed to save step metrics: {}", e);
        }

        Ok(&self.metrics)
    }

    fn save_samples(&self, model: &DCGAN, fixed_noise: &Tensor, file_name: String) {
        let samples = model.generate_from_noise(fixed_noise);
        let path = PathBuf::from(&self.config.sample_dir).join(file_name);
        let nrow = (self.config.num_fixed_samples as f64).sqrt().ceil() as i64;

        match save_grid(&samples, &path, nrow) {
            Ok(()) => info!("Saved samples to {}", path.display()),
            Err(e) => warn!("Failed to save samples: {}", e),
        }
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ImageFolder, ImageTransform};
    use crate::inspect::TracingInspector;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_training_config_default() {
        let config = TrainingConfig::default();
        assert_eq!(config.lr, 2e-4);
        assert_eq!(config.beta1, 0.5);
        assert_eq!(config.num_fixed_samples, 64);
    }

    #[test]
    fn test_train_one_epoch() {
        let data_dir = tempdir().unwrap();
        let out_dir = tempdir().unwrap();
        std::fs::create_dir_all(data_dir.path().join("x")).unwrap();
        for i in 0..4u8 {
            RgbImage::from_pixel(70, 64, Rgb([i * 60, 100, 200]))
                .save(data_dir.path().join(format!("x/{i}.png")))
                .unwrap();
        }

        let ds = ImageFolder::open(data_dir.path(), ImageTransform::new(64, 3)).unwrap();
        let mut loader = DataLoader::new(ds, 2, true, true).with_seed(1);
        let mut model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);

        let config = TrainingConfig {
            epochs: 1,
            log_every: 1,
            sample_every: 0,
            num_fixed_samples: 4,
            checkpoint_dir: out_dir.path().join("ckpt").to_string_lossy().into_owned(),
            sample_dir: out_dir.path().join("samples").to_string_lossy().into_owned(),
            ..Default::default()
        };

        let mut trainer = Trainer::new(config, Device::Cpu);
        let mut inspector = TracingInspector {
            every: 1,
            check_grads: true,
            ..Default::default()
        };
        let metrics = trainer
            .train_with_inspector(&mut model, &mut loader, &mut inspector)
            .unwrap();

        assert_eq!(metrics.num_steps(), 2);
        assert_eq!(metrics.num_epochs(), 1);
        assert!(out_dir.path().join("samples/epoch_0001.png").exists());
        assert!(out_dir.path().join("ckpt/checkpoint_epoch_0001/meta.json").exists());
        assert!(out_dir.path().join("ckpt/generator_final.pt").exists());
    }
}
