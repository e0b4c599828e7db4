//! Configuration management
//!
//! Provides unified configuration for the entire DCGAN pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::ImageTransform;
use crate::error::DcganError;
use crate::model::IMAGE_SIZE;
use crate::training::{OverfitConfig, TrainingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data configuration
    pub data: DataConfig,
    /// Model configuration
    pub model: ModelConfig,
    /// Training configuration
    pub training: TrainingConfigFile,
    /// Debugging configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Data-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory of the image folder
    pub dataroot: String,
    /// Spatial size of training images
    pub image_size: u32,
    /// Batch size
    pub batch_size: usize,
    /// Threads decoding images (0 = decode on the training thread)
    pub workers: usize,
    /// Shuffle every epoch
    pub shuffle: bool,
}

/// Model-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Latent vector size (nz)
    pub latent_dim: i64,
    /// Generator feature maps (ngf)
    pub gen_base_filters: i64,
    /// Discriminator feature maps (ndf)
    pub disc_base_filters: i64,
    /// Image channels (nc)
    pub channels: i64,
}

/// Training-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfigFile {
    /// Number of epochs
    pub epochs: usize,
    /// Adam learning rate
    pub lr: f64,
    /// Adam beta1
    pub beta1: f64,
    /// Real label used by the discriminator loss
    pub real_label: f64,
    /// Log every N steps
    pub log_every: usize,
    /// Save fixed-noise samples every N steps
    pub sample_every: usize,
    /// Checkpoint save frequency in epochs
    pub checkpoint_every: usize,
    /// Checkpoint directory
    pub checkpoint_dir: String,
    /// Sample grid directory
    pub sample_dir: String,
    /// Device: "cpu" or "cuda"
    pub device: String,
    /// Random seed (torch and shuffling)
    pub seed: Option<u64>,
}

/// Debugging and inspection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Inspect tensors every N steps (0 = never)
    pub inspect_every: usize,
    /// Abort on NaN/Inf losses or weights
    pub fail_on_non_finite: bool,
    /// Assert that every generator variable received a gradient
    pub check_grads: bool,
    /// Steps used by the single-batch overfit check
    pub overfit_steps: usize,
    /// Required drop of the discriminator loss during the overfit check
    pub overfit_ratio: f64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            inspect_every: 100,
            fail_on_non_finite: true,
            check_grads: false,
            overfit_steps: 200,
            overfit_ratio: 0.5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig {
                dataroot: "data/celeba".to_string(),
                image_size: IMAGE_SIZE as u32,
                batch_size: 128,
                workers: 2,
                shuffle: true,
            },
            model: ModelConfig {
                latent_dim: 100,
                gen_base_filters: 64,
                disc_base_filters: 64,
                channels: 3,
            },
            training: TrainingConfigFile {
                epochs: 5,
                lr: 2e-4,
                beta1: 0.5,
                real_label: 1.0,
                log_every: 50,
                sample_every: 500,
                checkpoint_every: 1,
                checkpoint_dir: "checkpoints".to_string(),
                sample_dir: "samples".to_string(),
                device: "cpu".to_string(),
                seed: Some(999),
            },
            debug: DebugConfig::default(),
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path` (format chosen by extension), or defaults if missing
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let config = if is_toml(path) {
            Self::from_toml(path)?
        } else {
            Self::from_json(path)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Get device from configuration
    pub fn get_device(&self) -> tch::Device {
        match self.training.device.to_lowercase().as_str() {
            "cuda" | "gpu" => {
                if tch::Cuda::is_available() {
                    tch::Device::Cuda(0)
                } else {
                    tracing::warn!("CUDA requested but not available, falling back to CPU");
                    tch::Device::Cpu
                }
            }
            _ => tch::Device::Cpu,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), DcganError> {
        let fail = |msg: &str| Err(DcganError::Config(msg.to_string()));

        if self.data.image_size as i64 != IMAGE_SIZE {
            return fail("image_size must be 64 for the DCGAN architecture");
        }
        if self.data.batch_size == 0 {
            return fail("batch_size must be > 0");
        }
        if self.model.latent_dim <= 0 {
            return fail("latent_dim must be > 0");
        }
        if self.model.gen_base_filters <= 0 || self.model.disc_base_filters <= 0 {
            return fail("feature map counts must be > 0");
        }
        if !matches!(self.model.channels, 1 | 3) {
            return fail("channels must be 1 or 3");
        }
        if self.training.epochs == 0 {
            return fail("epochs must be > 0");
        }
        if self.training.lr <= 0.0 {
            return fail("lr must be > 0");
        }
        if !(0.0..1.0).contains(&self.training.beta1) {
            return fail("beta1 must be in [0, 1)");
        }
        if !(0.0..=1.0).contains(&self.training.real_label) {
            return fail("real_label must be in [0, 1]");
        }
        Ok(())
    }

    /// Image transform matching the data and model settings
    pub fn transform(&self) -> ImageTransform {
        ImageTransform::new(self.data.image_size, self.model.channels as usize)
    }

    /// Trainer settings
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            epochs: self.training.epochs,
            lr: self.training.lr,
            beta1: self.training.beta1,
            real_label: self.training.real_label,
            log_every: self.training.log_every,
            sample_every: self.training.sample_every,
            checkpoint_every: self.training.checkpoint_every,
            checkpoint_dir: self.training.checkpoint_dir.clone(),
            sample_dir: self.training.sample_dir.clone(),
            ..Default::default()
        }
    }

    /// Single-batch overfit settings
    pub fn overfit_config(&self) -> OverfitConfig {
        OverfitConfig {
            steps: self.debug.overfit_steps,
            lr: self.training.lr,
            beta1: self.training.beta1,
            real_label: self.training.real_label,
            memorize_ratio: self.debug.overfit_ratio,
            ..Default::default()
        }
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

/// Write the default configuration to `path` (TOML or JSON by extension)
pub fn write_default_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let config = Config::default();
    if is_toml(path) {
        config.save_toml(path)?;
    } else {
        config.save_json(path)?;
    }
    Ok(config)
}
