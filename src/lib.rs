//! # DCGAN on Image Folders
//!
//! This crate builds, debugs and trains a Deep Convolutional Generative
//! Adversarial Network (DCGAN) on a directory of images using `tch`.
//!
//! ## Modules
//!
//! - `data`: Image folder dataset, preprocessing, batching and grid export
//! - `model`: DCGAN architecture (Generator and Discriminator)
//! - `training`: Adversarial update, training loop, single-batch overfitting
//! - `inspect`: Graph scan, tensor printing and assertion checks
//! - `utils`: Configuration and checkpoints

pub mod data;
pub mod error;
pub mod inspect;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{DataLoader, ImageFolder, ImageTransform};
pub use error::DcganError;
pub use inspect::{StepInspector, TracingInspector};
pub use model::{Discriminator, Generator, DCGAN};
pub use training::{Trainer, TrainingConfig, TrainingMetrics};
pub use utils::{load_checkpoint, save_checkpoint, Config};
