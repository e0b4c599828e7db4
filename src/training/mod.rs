//! Training module for DCGAN
//!
//! This module provides:
//! - The two-step adversarial update
//! - Training loop implementation
//! - Single mini-batch overfitting for debugging
//! - Loss functions (Binary Cross Entropy)
//! - Training configuration and metrics

mod losses;
mod metrics;
mod overfit;
mod step;
mod trainer;

pub use losses::{
    bce_with_label, discriminator_loss, discriminator_loss_smoothed, generator_loss, FAKE_LABEL,
    REAL_LABEL,
};
pub use metrics::{EmaTracker, TrainingMetrics};
pub use overfit::{overfit_batch, OverfitConfig, OverfitReport};
pub use step::{adversarial_step, StepReport};
pub use trainer::{Trainer, TrainingConfig};
