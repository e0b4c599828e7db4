//! Discriminator network for DCGAN
//!
//! The Discriminator classifies 64x64 images as real or fake.
//! Five strided convolutions reduce the image to a single probability.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

/// Negative slope used by every LeakyReLU in the discriminator
pub const LEAKY_SLOPE: f64 = 0.2;

/// Discriminator network configuration
#[derive(Debug, Clone)]
pub struct DiscriminatorConfig {
    /// Input image channels (nc)
    pub channels: i64,
    /// Feature maps in the first block (ndf)
    pub base_filters: i64,
}

impl Default for DiscriminatorConfig {
    fn default() -> Self {
        Self {
            channels: 3,
            base_filters: 64,
        }
    }
}

/// Discriminator network
///
/// Architecture (output sizes for a 64x64 input):
/// 1. Conv2d(nc -> ndf, k4 s2 p1), LeakyReLU(0.2): 32x32
/// 2. Conv2d(ndf -> ndf*2, k4 s2 p1), BatchNorm, LeakyReLU(0.2): 16x16
/// 3. Conv2d(ndf*2 -> ndf*4, k4 s2 p1), BatchNorm, LeakyReLU(0.2): 8x8
/// 4. Conv2d(ndf*4 -> ndf*8, k4 s2 p1), BatchNorm, LeakyReLU(0.2): 4x4
/// 5. Conv2d(ndf*8 -> 1, k4 s1 p0), Sigmoid: 1x1
#[derive(Debug)]
pub struct Discriminator {
    config: DiscriminatorConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
    bn3: nn::BatchNorm,
    conv4: nn::Conv2D,
    bn4: nn::BatchNorm,
    conv5: nn::Conv2D,
}

fn down_config(stride: i64, padding: i64) -> nn::ConvConfig {
    nn::ConvConfig {
        stride,
        padding,
        bias: false,
        ..Default::default()
    }
}

/// LeakyReLU with an explicit negative slope
pub fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.clamp_min(0.0) + xs.clamp_max(0.0) * slope
}

impl Discriminator {
    /// Create a new Discriminator network
    pub fn new(vs: &nn::Path, config: DiscriminatorConfig) -> Self {
        let ndf = config.base_filters;

        let conv1 = nn::conv2d(vs / "conv1", config.channels, ndf, 4, down_config(2, 1));

        let conv2 = nn::conv2d(vs / "conv2", ndf, ndf * 2, 4, down_config(2, 1));
        let bn2 = nn::batch_norm2d(vs / "bn2", ndf * 2, Default::default());

        let conv3 = nn::conv2d(vs / "conv3", ndf * 2, ndf * 4, 4, down_config(2, 1));
        let bn3 = nn::batch_norm2d(vs / "bn3", ndf * 4, Default::default());

        let conv4 = nn::conv2d(vs / "conv4", ndf * 4, ndf * 8, 4, down_config(2, 1));
        let bn4 = nn::batch_norm2d(vs / "bn4", ndf * 8, Default::default());

        let conv5 = nn::conv2d(vs / "conv5", ndf * 8, 1, 4, down_config(1, 0));

        Self {
            config,
            conv1,
            conv2,
            bn2,
            conv3,
            bn3,
            conv4,
            bn4,
            conv5,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, channels, 64, 64)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size,) with the probability of each image being real
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let x = leaky_relu(&self.conv1.forward(input), LEAKY_SLOPE);
        let x = leaky_relu(&self.bn2.forward_t(&self.conv2.forward(&x), train), LEAKY_SLOPE);
        let x = leaky_relu(&self.bn3.forward_t(&self.conv3.forward(&x), train), LEAKY_SLOPE);
        let x = leaky_relu(&self.bn4.forward_t(&self.conv4.forward(&x), train), LEAKY_SLOPE);

        self.conv5.forward(&x).sigmoid().view([-1])
    }

    /// Classify samples (inference mode)
    pub fn classify(&self, input: &Tensor) -> Tensor {
        self.forward_t(input, false)
    }

    /// Get configuration
    pub fn config(&self) -> &DiscriminatorConfig {
        &self.config
    }
}

impl ModuleT for Discriminator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Discriminator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    fn small() -> DiscriminatorConfig {
        DiscriminatorConfig {
            channels: 3,
            base_filters: 8,
        }
    }

    #[test]
    fn test_discriminator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), small());

        let input = Tensor::randn([4, 3, 64, 64], (Kind::Float, Device::Cpu));
        let output = disc.forward_t(&input, false);

        assert_eq!(output.size(), vec![4]);
    }

    #[test]
    fn test_discriminator_probabilities() {
        let vs = VarStore::new(Device::Cpu);
        let disc = Discriminator::new(&vs.root(), small());

        let input = Tensor::randn([2, 3, 64, 64], (Kind::Float, Device::Cpu));
        let probs = disc.classify(&input);

        let min_val: f64 = probs.min().double_value(&[]);
        let max_val: f64 = probs.max().double_value(&[]);
        assert!(min_val >= 0.0 && max_val <= 1.0);
    }

    #[test]
    fn test_leaky_relu_slope() {
        let xs = Tensor::from_slice(&[-10.0f32, 0.0, 5.0]);
        let ys = leaky_relu(&xs, 0.2);

        assert!((ys.double_value(&[0]) + 2.0).abs() < 1e-6);
        assert_eq!(ys.double_value(&[1]), 0.0);
        assert_eq!(ys.double_value(&[2]), 5.0);
    }
}
