//! Training metrics for monitoring GAN progress
//!
//! Tracks per-iteration losses and discriminator outputs, plus epoch averages.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;

use super::step::StepReport;

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Every adversarial step, in order
    pub steps: Vec<StepReport>,
    /// Generator losses per epoch
    pub gen_losses: Vec<f64>,
    /// Discriminator losses per epoch
    pub disc_losses: Vec<f64>,
    /// Mean D(x) per epoch
    pub d_x: Vec<f64>,
    /// Mean D(G(z)) seen by the discriminator update, per epoch
    pub d_g_z: Vec<f64>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one adversarial step
    pub fn record_step(&mut self, report: StepReport) {
        self.steps.push(report);
    }

    /// Average the steps of `epoch` and record them as one epoch entry
    pub fn close_epoch(&mut self, epoch: usize) -> Option<(f64, f64, f64, f64)> {
        let reports: Vec<&StepReport> = self.steps.iter().filter(|s| s.epoch == epoch).collect();
        if reports.is_empty() {
            return None;
        }

        let n = reports.len() as f64;
        let avg = |f: fn(&StepReport) -> f64| reports.iter().map(|r| f(r)).sum::<f64>() / n;

        let entry = (
            avg(|r| r.g_loss),
            avg(|r| r.d_loss),
            avg(|r| r.d_x),
            avg(|r| r.d_g_z1),
        );
        self.record_epoch(entry.0, entry.1, entry.2, entry.3);
        Some(entry)
    }

    /// Record epoch metrics
    pub fn record_epoch(&mut self, gen_loss: f64, disc_loss: f64, d_x: f64, d_g_z: f64) {
        self.gen_losses.push(gen_loss);
        self.disc_losses.push(disc_loss);
        self.d_x.push(d_x);
        self.d_g_z.push(d_g_z);
    }

    /// Get number of recorded epochs
    pub fn num_epochs(&self) -> usize {
        self.gen_losses.len()
    }

    /// Get number of recorded steps
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Get latest generator loss
    pub fn latest_gen_loss(&self) -> Option<f64> {
        self.gen_losses.last().copied()
    }

    /// Get latest discriminator loss
    pub fn latest_disc_loss(&self) -> Option<f64> {
        self.disc_losses.last().copied()
    }

    /// Calculate moving average of generator loss
    pub fn gen_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.gen_losses, window)
    }

    /// Calculate moving average of discriminator loss
    pub fn disc_loss_ma(&self, window: usize) -> f64 {
        moving_average(&self.disc_losses, window)
    }

    /// Check if training appears to have collapsed
    ///
    /// Collapse indicators:
    /// - Discriminator loss very low (can easily distinguish)
    /// - Generator loss very high (can't fool discriminator)
    pub fn check_mode_collapse(&self, window: usize) -> bool {
        if self.num_epochs() < window {
            return false;
        }

        self.disc_loss_ma(window) < 0.1 && self.gen_loss_ma(window) > 5.0
    }

    /// Save epoch metrics to CSV file
    pub fn save_csv(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "gen_loss", "disc_loss", "d_x", "d_g_z"])?;

        for i in 0..self.num_epochs() {
            writer.write_record([
                (i + 1).to_string(),
                self.gen_losses[i].to_string(),
                self.disc_losses[i].to_string(),
                self.d_x[i].to_string(),
                self.d_g_z[i].to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Save per-step metrics to CSV file
    pub fn save_steps_csv(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;

        writer.write_record(["epoch", "step", "d_loss", "g_loss", "d_x", "d_g_z1", "d_g_z2"])?;

        for s in &self.steps {
            writer.write_record([
                (s.epoch + 1).to_string(),
                s.step.to_string(),
                s.d_loss.to_string(),
                s.g_loss.to_string(),
                s.d_x.to_string(),
                s.d_g_z1.to_string(),
                s.d_g_z2.to_string(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load epoch metrics from CSV file
    pub fn load_csv(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut metrics = Self::new();

        for result in reader.records() {
            let record = result?;
            metrics.gen_losses.push(field(&record, 1, "gen_loss")?);
            metrics.disc_losses.push(field(&record, 2, "disc_loss")?);
            metrics.d_x.push(field(&record, 3, "d_x")?);
            metrics.d_g_z.push(field(&record, 4, "d_g_z")?);
        }

        Ok(metrics)
    }

    /// Load per-step records written by `save_steps_csv`
    pub fn load_steps_csv(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut steps = Vec::new();

        for result in reader.records() {
            let record = result?;
            let epoch: usize = field(&record, 0, "epoch")?;
            steps.push(StepReport {
                epoch: epoch.saturating_sub(1),
                step: field(&record, 1, "step")?,
                d_loss: field(&record, 2, "d_loss")?,
                g_loss: field(&record, 3, "g_loss")?,
                d_x: field(&record, 4, "d_x")?,
                d_g_z1: field(&record, 5, "d_g_z1")?,
                d_g_z2: field(&record, 6, "d_g_z2")?,
            });
        }

        self.steps = steps;
        Ok(())
    }

    /// Number of the last recorded step (0 before training)
    pub fn global_step(&self) -> usize {
        self.steps.last().map(|s| s.step).unwrap_or(0)
    }
}

fn field<T>(record: &csv::StringRecord, index: usize, name: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = record
        .get(index)
        .with_context(|| format!("missing `{name}` column in metrics row {:?}", record))?;
    raw.parse()
        .with_context(|| format!("invalid `{name}` value {raw:?}"))
}

/// Exponential moving average tracker
#[derive(Debug)]
pub struct EmaTracker {
    value: f64,
    alpha: f64,
    initialized: bool,
}

impl EmaTracker {
    /// Create new EMA tracker
    ///
    /// # Arguments
    ///
    /// * `alpha` - Smoothing factor (0 < alpha <= 1). Higher = more weight on recent
    pub fn new(alpha: f64) -> Self {
        Self {
            value: 0.0,
            alpha: alpha.clamp(0.001, 1.0),
            initialized: false,
        }
    }

    /// Update with new value
    pub fn update(&mut self, new_value: f64) {
        if !self.initialized {
            self.value = new_value;
            self.initialized = true;
        } else {
            self.value = self.alpha * new_value + (1.0 - self.alpha) * self.value;
        }
    }

    /// Get current EMA value
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Calculate moving average of last `window` values
fn moving_average(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let n = window.min(values.len()).max(1);
    let sum: f64 = values.iter().rev().take(n).sum();
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(epoch: usize, step: usize, d_loss: f64, g_loss: f64) -> StepReport {
        StepReport {
            epoch,
            step,
            d_loss,
            g_loss,
            d_x: 0.6,
            d_g_z1: 0.4,
            d_g_z2: 0.3,
        }
    }

    #[test]
    fn test_close_epoch_averages_steps() {
        let mut metrics = TrainingMetrics::new();
        metrics.record_step(step(0, 1, 1.0, 2.0));
        metrics.record_step(step(0, 2, 3.0, 4.0));
        metrics.record_step(step(1, 3, 9.0, 9.0));

        let (g, d, d_x, d_g_z) = metrics.close_epoch(0).unwrap();
        assert_eq!(g, 3.0);
        assert_eq!(d, 2.0);
        assert!((d_x - 0.6).abs() < 1e-12);
        assert!((d_g_z - 0.4).abs() < 1e-12);

        assert_eq!(metrics.num_epochs(), 1);
        assert_eq!(metrics.num_steps(), 3);
        assert!(metrics.close_epoch(5).is_none());
    }

    #[test]
    fn test_mode_collapse_heuristic() {
        let mut metrics = TrainingMetrics::new();
        for _ in 0..5 {
            metrics.record_epoch(8.0, 0.01, 0.99, 0.01);
        }

        assert!(metrics.check_mode_collapse(5));
        assert!(!metrics.check_mode_collapse(10));
    }

    #[test]
    fn test_csv_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");

        let mut metrics = TrainingMetrics::new();
        metrics.record_epoch(1.5, 0.8, 0.6, 0.3);
        metrics.record_epoch(1.3, 0.75, 0.65, 0.35);
        metrics.save_csv(&path).unwrap();

        let loaded = TrainingMetrics::load_csv(&path).unwrap();
        assert_eq!(loaded.num_epochs(), 2);
        assert_eq!(loaded.latest_gen_loss(), Some(1.3));
    }

    #[test]
    fn test_steps_csv_restores_step_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("steps.csv");

        let mut metrics = TrainingMetrics::new();
        metrics.record_step(step(0, 1, 1.0, 2.0));
        metrics.record_step(step(1, 2, 0.9, 2.1));
        metrics.save_steps_csv(&path).unwrap();

        let mut loaded = TrainingMetrics::new();
        loaded.load_steps_csv(&path).unwrap();
        assert_eq!(loaded.steps, metrics.steps);
        assert_eq!(loaded.global_step(), 2);
        assert_eq!(TrainingMetrics::new().global_step(), 0);
    }

    #[test]
    fn test_truncated_csv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        std::fs::write(&path, "epoch,gen_loss,disc_loss,d_x,d_g_z\n1,1.5,0.8\n").unwrap();

        assert!(TrainingMetrics::load_csv(&path).is_err());
    }

    #[test]
    fn test_ema_tracker() {
        let mut ema = EmaTracker::new(0.5);

        ema.update(10.0);
        assert_eq!(ema.value(), 10.0);

        ema.update(20.0);
        assert_eq!(ema.value(), 15.0);
    }
}
