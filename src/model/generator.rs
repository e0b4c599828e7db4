//! Generator network for DCGAN
//!
//! The Generator maps latent noise vectors to 64x64 images.
//! Five transposed-convolution blocks double the spatial size at each step.

use tch::{nn, nn::Module, nn::ModuleT, Device, Tensor};

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector (nz)
    pub latent_dim: i64,
    /// Feature maps in the last hidden block (ngf)
    pub base_filters: i64,
    /// Output image channels (nc)
    pub channels: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            base_filters: 64,
            channels: 3,
        }
    }
}

/// Generator network
///
/// Architecture (output sizes for a 1x1 latent input):
/// 1. ConvTranspose2d(nz -> ngf*8, k4 s1 p0), BatchNorm, ReLU: 4x4
/// 2. ConvTranspose2d(ngf*8 -> ngf*4, k4 s2 p1), BatchNorm, ReLU: 8x8
/// 3. ConvTranspose2d(ngf*4 -> ngf*2, k4 s2 p1), BatchNorm, ReLU: 16x16
/// 4. ConvTranspose2d(ngf*2 -> ngf, k4 s2 p1), BatchNorm, ReLU: 32x32
/// 5. ConvTranspose2d(ngf -> nc, k4 s2 p1), Tanh: 64x64
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    conv1: nn::ConvTranspose2D,
    bn1: nn::BatchNorm,
    conv2: nn::ConvTranspose2D,
    bn2: nn::BatchNorm,
    conv3: nn::ConvTranspose2D,
    bn3: nn::BatchNorm,
    conv4: nn::ConvTranspose2D,
    bn4: nn::BatchNorm,
    conv5: nn::ConvTranspose2D,
}

fn up_config(stride: i64, padding: i64) -> nn::ConvTransposeConfig {
    nn::ConvTransposeConfig {
        stride,
        padding,
        bias: false,
        ..Default::default()
    }
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let ngf = config.base_filters;

        let conv1 = nn::conv_transpose2d(vs / "conv1", config.latent_dim, ngf * 8, 4, up_config(1, 0));
        let bn1 = nn::batch_norm2d(vs / "bn1", ngf * 8, Default::default());

        let conv2 = nn::conv_transpose2d(vs / "conv2", ngf * 8, ngf * 4, 4, up_config(2, 1));
        let bn2 = nn::batch_norm2d(vs / "bn2", ngf * 4, Default::default());

        let conv3 = nn::conv_transpose2d(vs / "conv3", ngf * 4, ngf * 2, 4, up_config(2, 1));
        let bn3 = nn::batch_norm2d(vs / "bn3", ngf * 2, Default::default());

        let conv4 = nn::conv_transpose2d(vs / "conv4", ngf * 2, ngf, 4, up_config(2, 1));
        let bn4 = nn::batch_norm2d(vs / "bn4", ngf, Default::default());

        // Final layer: no batch norm, tanh activation
        let conv5 = nn::conv_transpose2d(vs / "conv5", ngf, config.channels, 4, up_config(2, 1));

        Self {
            config,
            conv1,
            bn1,
            conv2,
            bn2,
            conv3,
            bn3,
            conv4,
            bn4,
            conv5,
        }
    }

    /// Generate images from noise
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim) or (batch_size, latent_dim, 1, 1)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, channels, 64, 64) with values in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let x = noise.view([batch_size, self.config.latent_dim, 1, 1]);

        let x = self.bn1.forward_t(&self.conv1.forward(&x), train).relu();
        let x = self.bn2.forward_t(&self.conv2.forward(&x), train).relu();
        let x = self.bn3.forward_t(&self.conv3.forward(&x), train).relu();
        let x = self.bn4.forward_t(&self.conv4.forward(&x), train).relu();

        self.conv5.forward(&x).tanh()
    }

    /// Generate samples (inference mode)
    pub fn generate(&self, noise: &Tensor) -> Tensor {
        self.forward_t(noise, false)
    }

    /// Generate from fresh standard normal noise
    pub fn generate_random(&self, num_samples: i64, device: Device) -> Tensor {
        let noise = Tensor::randn(
            [num_samples, self.config.latent_dim, 1, 1],
            (tch::Kind::Float, device),
        );
        self.generate(&noise)
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::nn::VarStore;

    fn small() -> GeneratorConfig {
        GeneratorConfig {
            latent_dim: 16,
            base_filters: 8,
            channels: 3,
        }
    }

    #[test]
    fn test_generator_output_shape() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), small());

        let noise = Tensor::randn([4, 16, 1, 1], (tch::Kind::Float, Device::Cpu));
        let output = gen.generate(&noise);

        assert_eq!(output.size(), vec![4, 3, 64, 64]);
    }

    #[test]
    fn test_generator_accepts_flat_noise() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), small());

        let noise = Tensor::randn([2, 16], (tch::Kind::Float, Device::Cpu));
        assert_eq!(gen.generate(&noise).size(), vec![2, 3, 64, 64]);
    }

    #[test]
    fn test_generator_tanh_range() {
        let vs = VarStore::new(Device::Cpu);
        let gen = Generator::new(&vs.root(), small());

        let output = gen.generate_random(2, Device::Cpu);
        assert!(output.min().double_value(&[]) >= -1.0);
        assert!(output.max().double_value(&[]) <= 1.0);
    }

    #[test]
    fn test_generator_has_no_conv_bias() {
        let vs = VarStore::new(Device::Cpu);
        let _gen = Generator::new(&vs.root(), small());

        let names: Vec<String> = vs.variables().into_keys().collect();
        assert!(names.iter().any(|n| n == "conv1.weight"));
        assert!(!names.iter().any(|n| n.starts_with("conv") && n.ends_with(".bias")));
    }
}
