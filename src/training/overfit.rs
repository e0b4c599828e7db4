//! Overfitting a single mini-batch
//!
//! Before a full run, the two networks are trained repeatedly on one fixed
//! batch. A correctly wired discriminator memorizes that batch quickly, so
//! its loss must fall; if it does not, the data pipeline, the losses or the
//! optimizer wiring are broken.

use tch::Tensor;
use tracing::{debug, info, warn};

use super::losses::REAL_LABEL;
use super::step::{adversarial_step, StepReport};
use crate::inspect::StepInspector;
use crate::model::DCGAN;

/// Settings for a single-batch overfit run
#[derive(Debug, Clone)]
pub struct OverfitConfig {
    /// Number of adversarial steps on the batch
    pub steps: usize,
    /// Adam learning rate
    pub lr: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Target for real images in the discriminator loss
    pub real_label: f64,
    /// Reuse one noise batch so the whole problem is fixed
    pub fixed_noise: bool,
    /// Final D loss must be below this fraction of the first one
    pub memorize_ratio: f64,
    /// Log every N steps
    pub log_every: usize,
}

impl Default for OverfitConfig {
    fn default() -> Self {
        Self {
            steps: 200,
            lr: 2e-4,
            beta1: 0.5,
            real_label: REAL_LABEL,
            fixed_noise: true,
            memorize_ratio: 0.5,
            log_every: 20,
        }
    }
}

/// Result of an overfit run
#[derive(Debug, Clone)]
pub struct OverfitReport {
    /// Every step in order
    pub history: Vec<StepReport>,
    /// Threshold used by `discriminator_memorized`
    pub memorize_ratio: f64,
}

impl OverfitReport {
    /// Discriminator loss of the first step
    pub fn first_d_loss(&self) -> Option<f64> {
        self.history.first().map(|r| r.d_loss)
    }

    /// Discriminator loss of the last step
    pub fn last_d_loss(&self) -> Option<f64> {
        self.history.last().map(|r| r.d_loss)
    }

    /// Final step
    pub fn last(&self) -> Option<&StepReport> {
        self.history.last()
    }

    /// Whether the discriminator loss fell below `memorize_ratio` of its start
    pub fn discriminator_memorized(&self) -> bool {
        match (self.first_d_loss(), self.last_d_loss()) {
            (Some(first), Some(last)) => last.is_finite() && last < first * self.memorize_ratio,
            _ => false,
        }
    }

    /// All recorded losses are finite
    pub fn all_finite(&self) -> bool {
        self.history.iter().all(StepReport::is_finite)
    }
}

/// Train both networks on `batch` for `config.steps` steps
///
/// # Arguments
///
/// * `model` - DCGAN to train in place
/// * `batch` - Real images of shape (N, C, 64, 64) normalized to [-1, 1]
/// * `config` - Overfit settings
/// * `inspector` - Hooks run around every step
pub fn overfit_batch(
    model: &mut DCGAN,
    batch: &Tensor,
    config: &OverfitConfig,
    inspector: &mut dyn StepInspector,
) -> anyhow::Result<OverfitReport> {
    let mut gen_opt = model.gen_optimizer(config.lr, config.beta1)?;
    let mut disc_opt = model.disc_optimizer(config.lr, config.beta1)?;

    let batch_size = batch.size()[0];
    let fixed = model.sample_noise(batch_size);
    let mut history = Vec::with_capacity(config.steps);

    info!("Overfitting one batch of {} images for {} steps", batch_size, config.steps);

    for step in 1..=config.steps {
        inspector.before_step(step, batch, model)?;

        let noise = if config.fixed_noise {
            fixed.shallow_clone()
        } else {
            model.sample_noise(batch_size)
        };

        let mut report = adversarial_step(
            model,
            batch,
            &noise,
            &mut gen_opt,
            &mut disc_opt,
            config.real_label,
        );
        report.step = step;

        inspector.after_step(&report, model)?;

        if config.log_every > 0 && step % config.log_every == 0 {
            debug!(
                "overfit step {}: D={:.4} G={:.4} D(x)={:.4} D(G(z))={:.4}",
                step, report.d_loss, report.g_loss, report.d_x, report.d_g_z1
            );
        }

        history.push(report);
    }

    let report = OverfitReport {
        history,
        memorize_ratio: config.memorize_ratio,
    };

    if let (Some(first), Some(last)) = (report.first_d_loss(), report.last_d_loss()) {
        if report.discriminator_memorized() {
            info!("Discriminator memorized the batch: D loss {:.4} -> {:.4}", first, last);
        } else {
            warn!(
                "Discriminator did not memorize the batch: D loss {:.4} -> {:.4}",
                first, last
            );
        }
    }

    Ok(report)
}
