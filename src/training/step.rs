//! One adversarial update: a discriminator step followed by a generator step

use tch::{nn, Kind, Tensor};

use super::losses::{bce_with_label, generator_loss, FAKE_LABEL};
use crate::model::DCGAN;

/// Outcome of a single adversarial step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Zero-based epoch
    pub epoch: usize,
    /// Global iteration counter, starting at 1
    pub step: usize,
    /// Discriminator loss (real + fake terms)
    pub d_loss: f64,
    /// Generator loss
    pub g_loss: f64,
    /// Mean D(x) on the real batch
    pub d_x: f64,
    /// Mean D(G(z)) before the discriminator update
    pub d_g_z1: f64,
    /// Mean D(G(z)) after the discriminator update
    pub d_g_z2: f64,
}

impl StepReport {
    /// Both losses are finite
    pub fn is_finite(&self) -> bool {
        self.d_loss.is_finite() && self.g_loss.is_finite()
    }
}

/// Run one discriminator update and one generator update
///
/// Discriminator: gradients of BCE(D(x), real_label) and BCE(D(G(z).detach()), 0)
/// are accumulated, then its optimizer steps once.
/// Generator: the same fake batch is relabeled as real and pushed through
/// the freshly updated discriminator.
pub fn adversarial_step(
    model: &DCGAN,
    real: &Tensor,
    noise: &Tensor,
    gen_opt: &mut nn::Optimizer,
    disc_opt: &mut nn::Optimizer,
    real_label: f64,
) -> StepReport {
    // ========== Train Discriminator ==========
    disc_opt.zero_grad();

    let real_output = model.discriminator.forward_t(real, true);
    let err_real = bce_with_label(&real_output, real_label);
    err_real.backward();
    let d_x = real_output.mean(Kind::Float).double_value(&[]);

    let fake = model.generator.forward_t(noise, true);
    let fake_output = model.discriminator.forward_t(&fake.detach(), true);
    let err_fake = bce_with_label(&fake_output, FAKE_LABEL);
    err_fake.backward();
    let d_g_z1 = fake_output.mean(Kind::Float).double_value(&[]);

    disc_opt.step();

    // ========== Train Generator ==========
    gen_opt.zero_grad();

    let output = model.discriminator.forward_t(&fake, true);
    let err_g = generator_loss(&output);
    err_g.backward();
    let d_g_z2 = output.mean(Kind::Float).double_value(&[]);

    gen_opt.step();

    StepReport {
        epoch: 0,
        step: 0,
        d_loss: err_real.double_value(&[]) + err_fake.double_value(&[]),
        g_loss: err_g.double_value(&[]),
        d_x,
        d_g_z1,
        d_g_z2,
    }
}
