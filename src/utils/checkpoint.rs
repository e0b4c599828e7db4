//! Checkpoint save/load utilities
//!
//! Each checkpoint is a directory holding both networks, a metadata file
//! and the epoch metrics recorded so far.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::DCGAN;
use crate::training::TrainingMetrics;

const CHECKPOINT_PREFIX: &str = "checkpoint_epoch_";

/// Checkpoint metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epochs completed
    pub epoch: usize,
    /// Number of the last adversarial step
    #[serde(default)]
    pub global_step: usize,
    /// Generator loss at checkpoint
    pub gen_loss: f64,
    /// Discriminator loss at checkpoint
    pub disc_loss: f64,
    /// Timestamp of checkpoint
    pub timestamp: String,
    /// Model hyper-parameters
    pub model: ModelMeta,
}

/// Hyper-parameters needed to rebuild the networks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub latent_dim: i64,
    pub ngf: i64,
    pub ndf: i64,
    pub channels: i64,
}

impl ModelMeta {
    /// Describe `model`
    pub fn of(model: &DCGAN) -> Self {
        Self {
            latent_dim: model.latent_dim(),
            ngf: model.ngf(),
            ndf: model.ndf(),
            channels: model.channels(),
        }
    }

    /// Build an untrained model with these hyper-parameters
    pub fn build(&self, device: tch::Device) -> DCGAN {
        DCGAN::with_defaults(self.latent_dim, self.ngf, self.ndf, self.channels, device)
    }
}

/// Save a complete checkpoint (model + metadata)
///
/// # Arguments
///
/// * `model` - DCGAN model to save
/// * `metrics` - Training metrics
/// * `epoch` - Epochs completed
/// * `dir` - Directory holding all checkpoints
///
/// # Returns
///
/// Path to saved checkpoint
pub fn save_checkpoint(
    model: &DCGAN,
    metrics: &TrainingMetrics,
    epoch: usize,
    dir: impl AsRef<Path>,
) -> anyhow::Result<PathBuf> {
    let checkpoint_dir = dir.as_ref().join(format!("{CHECKPOINT_PREFIX}{epoch:04}"));
    std::fs::create_dir_all(&checkpoint_dir)?;

    model.save(
        checkpoint_dir.join("generator.pt"),
        checkpoint_dir.join("discriminator.pt"),
    )?;

    let meta = CheckpointMeta {
        epoch,
        global_step: metrics.global_step(),
        gen_loss: metrics.latest_gen_loss().unwrap_or(0.0),
        disc_loss: metrics.latest_disc_loss().unwrap_or(0.0),
        timestamp: chrono::Utc::now().to_rfc3339(),
        model: ModelMeta::of(model),
    };

    let meta_json = serde_json::to_string_pretty(&meta)?;
    std::fs::write(checkpoint_dir.join("meta.json"), meta_json)?;

    metrics.save_csv(checkpoint_dir.join("metrics.csv"))?;
    metrics.save_steps_csv(checkpoint_dir.join("steps.csv"))?;

    tracing::info!("Saved checkpoint to {}", checkpoint_dir.display());
    Ok(checkpoint_dir)
}

/// Load checkpoint metadata
pub fn load_checkpoint_meta(checkpoint_dir: impl AsRef<Path>) -> anyhow::Result<CheckpointMeta> {
    let content = std::fs::read_to_string(checkpoint_dir.as_ref().join("meta.json"))?;
    let meta: CheckpointMeta = serde_json::from_str(&content)?;
    Ok(meta)
}

/// Load a complete checkpoint into an existing model
///
/// # Returns
///
/// Tuple of (epoch, metrics)
pub fn load_checkpoint(
    model: &mut DCGAN,
    checkpoint_dir: impl AsRef<Path>,
) -> anyhow::Result<(usize, TrainingMetrics)> {
    let checkpoint_dir = checkpoint_dir.as_ref();
    let meta = load_checkpoint_meta(checkpoint_dir)?;

    let expected = ModelMeta::of(model);
    if meta.model != expected {
        anyhow::bail!(
            "checkpoint {} was saved with {:?}, model has {:?}",
            checkpoint_dir.display(),
            meta.model,
            expected
        );
    }

    model.load(
        checkpoint_dir.join("generator.pt"),
        checkpoint_dir.join("discriminator.pt"),
    )?;

    let metrics_path = checkpoint_dir.join("metrics.csv");
    let mut metrics = if metrics_path.exists() {
        TrainingMetrics::load_csv(&metrics_path)?
    } else {
        TrainingMetrics::new()
    };

    let steps_path = checkpoint_dir.join("steps.csv");
    if steps_path.exists() {
        metrics.load_steps_csv(&steps_path)?;
    }
    if metrics.global_step() != meta.global_step {
        tracing::warn!(
            "Checkpoint {} records step {} but its step log ends at {}",
            checkpoint_dir.display(),
            meta.global_step,
            metrics.global_step()
        );
    }

    tracing::info!(
        "Loaded checkpoint from {} (epoch {}, step {})",
        checkpoint_dir.display(),
        meta.epoch,
        meta.global_step
    );
    Ok((meta.epoch, metrics))
}

/// Rebuild a model from a checkpoint directory alone
pub fn model_from_checkpoint(checkpoint_dir: impl AsRef<Path>, device: tch::Device) -> anyhow::Result<DCGAN> {
    let meta = load_checkpoint_meta(&checkpoint_dir)?;
    let mut model = meta.model.build(device);
    load_checkpoint(&mut model, checkpoint_dir)?;
    Ok(model)
}

fn checkpoint_dirs(dir: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with(CHECKPOINT_PREFIX))
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();
    dirs.sort();
    dirs
}

/// Find the latest checkpoint in a directory
pub fn find_latest_checkpoint(dir: impl AsRef<Path>) -> Option<PathBuf> {
    checkpoint_dirs(dir.as_ref()).pop()
}

/// List all checkpoints in a directory, oldest first
pub fn list_checkpoints(dir: impl AsRef<Path>) -> Vec<(PathBuf, CheckpointMeta)> {
    checkpoint_dirs(dir.as_ref())
        .into_iter()
        .filter_map(|path| load_checkpoint_meta(&path).ok().map(|meta| (path, meta)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_find_latest() {
        let dir = tempdir().unwrap();
        let model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let mut metrics = TrainingMetrics::new();
        metrics.record_epoch(1.0, 0.5, 0.7, 0.3);

        save_checkpoint(&model, &metrics, 1, dir.path()).unwrap();
        save_checkpoint(&model, &metrics, 2, dir.path()).unwrap();

        let latest = find_latest_checkpoint(dir.path()).unwrap();
        assert!(latest.ends_with("checkpoint_epoch_0002"));

        let listed = list_checkpoints(dir.path());
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].1.epoch, 1);
        assert_eq!(listed[1].1.model, ModelMeta::of(&model));
    }

    #[test]
    fn test_load_checkpoint_roundtrip() {
        let dir = tempdir().unwrap();
        let model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let mut metrics = TrainingMetrics::new();
        for step in 1..=3 {
            metrics.record_step(crate::training::StepReport {
                epoch: 2,
                step,
                d_loss: 1.2,
                g_loss: 0.8,
                d_x: 0.6,
                d_g_z1: 0.4,
                d_g_z2: 0.35,
            });
        }
        metrics.record_epoch(1.0, 0.5, 0.7, 0.3);
        let path = save_checkpoint(&model, &metrics, 3, dir.path()).unwrap();
        assert_eq!(load_checkpoint_meta(&path).unwrap().global_step, 3);

        let restored = model_from_checkpoint(&path, Device::Cpu).unwrap();
        let noise = model.sample_noise(2);
        assert!(model
            .generate_from_noise(&noise)
            .allclose(&restored.generate_from_noise(&noise), 1e-5, 1e-6, false));

        let mut other = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let (epoch, loaded) = load_checkpoint(&mut other, &path).unwrap();
        assert_eq!(epoch, 3);
        assert_eq!(loaded.num_epochs(), 1);
        assert_eq!(loaded.num_steps(), 3);
        assert_eq!(loaded.global_step(), 3);
        assert_eq!(loaded.steps[0].epoch, 2);
    }

    #[test]
    fn test_load_rejects_mismatched_model() {
        let dir = tempdir().unwrap();
        let model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let path = save_checkpoint(&model, &TrainingMetrics::new(), 1, dir.path()).unwrap();

        let mut wider = DCGAN::with_defaults(8, 8, 4, 3, Device::Cpu);
        assert!(load_checkpoint(&mut wider, &path).is_err());
    }

    #[test]
    fn test_no_checkpoints() {
        let dir = tempdir().unwrap();
        assert!(find_latest_checkpoint(dir.path()).is_none());
        assert!(find_latest_checkpoint("/nonexistent/dir").is_none());
    }
}
