//! Hooks invoked by the trainer around every adversarial step

use tch::Tensor;
use tracing::{debug, info};

use super::assertions::{assert_finite, assert_grads_present, assert_range, assert_shape};
use super::stats::print_tensor;
use crate::error::{DcganError, Result};
use crate::model::{DCGAN, IMAGE_SIZE};
use crate::training::StepReport;

/// Observer called before and after each training step
///
/// Returning an error aborts training.
pub trait StepInspector {
    /// Called with the real batch before the discriminator update
    fn before_step(&mut self, _step: usize, _real: &Tensor, _model: &DCGAN) -> Result<()> {
        Ok(())
    }

    /// Called once both networks have been updated
    fn after_step(&mut self, _report: &StepReport, _model: &DCGAN) -> Result<()> {
        Ok(())
    }
}

/// Inspector that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInspector;

impl StepInspector for NoopInspector {}

/// Inspector logging tensors and running assertion checks through `tracing`
#[derive(Debug, Clone)]
pub struct TracingInspector {
    /// Inspect every N-th step (0 disables periodic tensor printing)
    pub every: usize,
    /// Abort on NaN/Inf losses
    pub fail_on_non_finite: bool,
    /// Check that both networks received gradients
    pub check_grads: bool,
}

impl Default for TracingInspector {
    fn default() -> Self {
        Self {
            every: 50,
            fail_on_non_finite: true,
            check_grads: false,
        }
    }
}

impl TracingInspector {
    fn due(&self, step: usize) -> bool {
        self.every > 0 && step % self.every == 0
    }
}

impl StepInspector for TracingInspector {
    fn before_step(&mut self, step: usize, real: &Tensor, model: &DCGAN) -> Result<()> {
        if !self.due(step) {
            return Ok(());
        }

        print_tensor("real_batch", real);
        assert_shape("real_batch", real, &[-1, model.channels(), IMAGE_SIZE, IMAGE_SIZE])?;
        assert_finite("real_batch", real)?;
        // Normalized inputs must share the generator's tanh range
        assert_range("real_batch", real, -1.0 - 1e-4, 1.0 + 1e-4)?;
        Ok(())
    }

    fn after_step(&mut self, report: &StepReport, model: &DCGAN) -> Result<()> {
        if self.fail_on_non_finite && !report.is_finite() {
            return Err(DcganError::assertion(
                "losses",
                format!(
                    "non-finite loss at step {}: D={} G={}",
                    report.step, report.d_loss, report.g_loss
                ),
            ));
        }

        if !self.due(report.step) {
            return Ok(());
        }

        debug!(
            "step {}: D={:.4} G={:.4} D(x)={:.4} D(G(z))={:.4}/{:.4}",
            report.step, report.d_loss, report.g_loss, report.d_x, report.d_g_z1, report.d_g_z2
        );

        if self.check_grads {
            // Generator gradients survive until the next zero_grad
            assert_grads_present("generator", &model.gen_vs)?;
        }

        for (name, var) in sorted_trainables(model) {
            let stats = print_tensor(&name, &var);
            if !stats.is_finite() {
                info!("Variable {name} went non-finite at step {}", report.step);
                if self.fail_on_non_finite {
                    return Err(DcganError::assertion(name, "non-finite weights"));
                }
            }
        }

        Ok(())
    }
}

fn sorted_trainables(model: &DCGAN) -> Vec<(String, Tensor)> {
    let mut vars: Vec<(String, Tensor)> = model
        .gen_vs
        .variables()
        .into_iter()
        .map(|(n, v)| (format!("generator.{n}"), v))
        .chain(
            model
                .disc_vs
                .variables()
                .into_iter()
                .map(|(n, v)| (format!("discriminator.{n}"), v)),
        )
        .filter(|(_, v)| v.requires_grad())
        .collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    fn report(step: usize, d_loss: f64) -> StepReport {
        StepReport {
            epoch: 0,
            step,
            d_loss,
            g_loss: 1.0,
            d_x: 0.5,
            d_g_z1: 0.5,
            d_g_z2: 0.5,
        }
    }

    #[test]
    fn test_noop_accepts_everything() {
        let model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let mut inspector = NoopInspector;

        assert!(inspector.after_step(&report(1, f64::NAN), &model).is_ok());
    }

    #[test]
    fn test_tracing_rejects_nan_loss() {
        let model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let mut inspector = TracingInspector::default();

        assert!(inspector.after_step(&report(1, 0.7), &model).is_ok());
        assert!(inspector.after_step(&report(2, f64::NAN), &model).is_err());
    }

    #[test]
    fn test_tracing_checks_real_batch() {
        let model = DCGAN::with_defaults(8, 4, 4, 3, Device::Cpu);
        let mut inspector = TracingInspector {
            every: 1,
            ..Default::default()
        };

        let good = Tensor::rand([2, 3, 64, 64], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
        assert!(inspector.before_step(1, &good, &model).is_ok());

        // Un-normalized pixels in [0, 255]
        let raw = Tensor::rand([2, 3, 64, 64], (Kind::Float, Device::Cpu)) * 255.0 + 2.0;
        assert!(inspector.before_step(1, &raw, &model).is_err());

        let wrong_size = Tensor::zeros([2, 3, 32, 32], (Kind::Float, Device::Cpu));
        assert!(inspector.before_step(1, &wrong_size, &model).is_err());
    }
}
