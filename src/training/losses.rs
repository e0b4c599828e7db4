//! Loss functions for GAN training
//!
//! Binary cross entropy on discriminator probabilities.
//! `adversarial_step` backpropagates the real and fake terms through
//! `bce_with_label` one at a time; `discriminator_loss` and
//! `generator_loss` give the summed objectives for evaluation.

use tch::Tensor;

/// Label assigned to real images
pub const REAL_LABEL: f64 = 1.0;
/// Label assigned to generated images
pub const FAKE_LABEL: f64 = 0.0;

/// Mean binary cross entropy between probabilities and a constant label
pub fn bce_with_label(probs: &Tensor, label: f64) -> Tensor {
    let targets = Tensor::full_like(probs, label);
    probs.binary_cross_entropy::<Tensor>(&targets, None, tch::Reduction::Mean)
}

/// Generator loss: -log(D(G(z)))
///
/// Fake samples are relabeled as real: the generator wants the
/// discriminator to output 1 for them.
///
/// # Arguments
///
/// * `fake_output` - Discriminator probabilities on generated samples
pub fn generator_loss(fake_output: &Tensor) -> Tensor {
    bce_with_label(fake_output, REAL_LABEL)
}

/// Discriminator loss: -log(D(x)) - log(1 - D(G(z)))
///
/// # Arguments
///
/// * `real_output` - Discriminator probabilities on real samples
/// * `fake_output` - Discriminator probabilities on generated samples
pub fn discriminator_loss(real_output: &Tensor, fake_output: &Tensor) -> Tensor {
    bce_with_label(real_output, REAL_LABEL) + bce_with_label(fake_output, FAKE_LABEL)
}

/// Discriminator loss with one-sided label smoothing
///
/// Real samples are labeled `real_label` (e.g. 0.9) instead of 1.0.
pub fn discriminator_loss_smoothed(
    real_output: &Tensor,
    fake_output: &Tensor,
    real_label: f64,
) -> Tensor {
    bce_with_label(real_output, real_label) + bce_with_label(fake_output, FAKE_LABEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{Device, Kind};

    fn probs(value: f64) -> Tensor {
        Tensor::full([4], value, (Kind::Float, Device::Cpu))
    }

    #[test]
    fn test_generator_loss() {
        let fake_output = Tensor::rand([4], (Kind::Float, Device::Cpu)) * 0.9 + 0.05;
        let loss = generator_loss(&fake_output);

        assert_eq!(loss.size(), Vec::<i64>::new());
        assert!(loss.double_value(&[]) > 0.0);
    }

    #[test]
    fn test_chance_level_losses() {
        // D(x) = D(G(z)) = 0.5 gives log(2) per term
        let half = probs(0.5);
        let ln2 = std::f64::consts::LN_2;

        assert!((generator_loss(&half).double_value(&[]) - ln2).abs() < 1e-5);
        assert!((discriminator_loss(&half, &half).double_value(&[]) - 2.0 * ln2).abs() < 1e-5);
    }

    #[test]
    fn test_perfect_discriminator() {
        let loss = discriminator_loss(&probs(0.999), &probs(0.001));
        assert!(loss.double_value(&[]) < 0.01);
    }

    #[test]
    fn test_smoothing_raises_floor() {
        let sharp = discriminator_loss(&probs(0.999), &probs(0.001)).double_value(&[]);
        let smooth = discriminator_loss_smoothed(&probs(0.999), &probs(0.001), 0.9).double_value(&[]);

        assert!(smooth > sharp);
    }
}
