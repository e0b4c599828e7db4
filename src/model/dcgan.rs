//! DCGAN wrapper combining Generator and Discriminator
//!
//! Provides convenient methods for training and generation.

use std::path::Path;

use tch::{nn, nn::OptimizerConfig, nn::VarStore, Device, Kind, Tensor};

use super::discriminator::{Discriminator, DiscriminatorConfig};
use super::generator::{Generator, GeneratorConfig};
use super::init::init_weights;

/// Spatial size produced by the generator and expected by the discriminator
pub const IMAGE_SIZE: i64 = 64;

/// Complete DCGAN model
pub struct DCGAN {
    /// Generator network
    pub generator: Generator,
    /// Discriminator network
    pub discriminator: Discriminator,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for discriminator
    pub disc_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
}

impl DCGAN {
    /// Create a new DCGAN model with DCGAN-initialized weights
    pub fn new(gen_config: GeneratorConfig, disc_config: DiscriminatorConfig, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let disc_vs = VarStore::new(device);

        let generator = Generator::new(&gen_vs.root(), gen_config);
        let discriminator = Discriminator::new(&disc_vs.root(), disc_config);

        init_weights(&gen_vs);
        init_weights(&disc_vs);

        Self {
            generator,
            discriminator,
            gen_vs,
            disc_vs,
            device,
        }
    }

    /// Create DCGAN from the usual hyper-parameters
    ///
    /// # Arguments
    ///
    /// * `latent_dim` - Size of latent noise vector (nz)
    /// * `ngf` - Generator feature maps
    /// * `ndf` - Discriminator feature maps
    /// * `channels` - Image channels (nc)
    /// * `device` - Device to create model on
    pub fn with_defaults(latent_dim: i64, ngf: i64, ndf: i64, channels: i64, device: Device) -> Self {
        let gen_config = GeneratorConfig {
            latent_dim,
            base_filters: ngf,
            channels,
        };

        let disc_config = DiscriminatorConfig {
            channels,
            base_filters: ndf,
        };

        Self::new(gen_config, disc_config, device)
    }

    /// Sample standard normal latent vectors of shape (n, latent_dim, 1, 1)
    pub fn sample_noise(&self, num_samples: i64) -> Tensor {
        Tensor::randn(
            [num_samples, self.latent_dim(), 1, 1],
            (Kind::Float, self.device),
        )
    }

    /// Generate synthetic images
    ///
    /// # Returns
    ///
    /// Tensor of shape (num_samples, channels, 64, 64)
    pub fn generate(&self, num_samples: i64) -> Tensor {
        let noise = self.sample_noise(num_samples);
        tch::no_grad(|| self.generator.generate(&noise))
    }

    /// Generate images from specific noise vectors
    pub fn generate_from_noise(&self, noise: &Tensor) -> Tensor {
        tch::no_grad(|| self.generator.generate(noise))
    }

    /// Probability of each image being real
    pub fn discriminate(&self, images: &Tensor) -> Tensor {
        tch::no_grad(|| self.discriminator.classify(images))
    }

    /// Get generator optimizer (Adam, beta2 = 0.999)
    pub fn gen_optimizer(&self, lr: f64, beta1: f64) -> Result<nn::Optimizer, tch::TchError> {
        nn::Adam {
            beta1,
            beta2: 0.999,
            wd: 0.0,
            ..Default::default()
        }
        .build(&self.gen_vs, lr)
    }

    /// Get discriminator optimizer (Adam, beta2 = 0.999)
    pub fn disc_optimizer(&self, lr: f64, beta1: f64) -> Result<nn::Optimizer, tch::TchError> {
        nn::Adam {
            beta1,
            beta2: 0.999,
            wd: 0.0,
            ..Default::default()
        }
        .build(&self.disc_vs, lr)
    }

    /// Save both networks
    pub fn save(&self, gen_path: impl AsRef<Path>, disc_path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.gen_vs.save(gen_path)?;
        self.disc_vs.save(disc_path)?;
        Ok(())
    }

    /// Load both networks
    pub fn load(&mut self, gen_path: impl AsRef<Path>, disc_path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.gen_vs.load(gen_path)?;
        self.disc_vs.load(disc_path)?;
        Ok(())
    }

    /// Load only the generator (enough for sampling)
    pub fn load_generator(&mut self, gen_path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.gen_vs.load(gen_path)?;
        Ok(())
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.generator.config().latent_dim
    }

    /// Get image channels
    pub fn channels(&self) -> i64 {
        self.generator.config().channels
    }

    /// Get generator feature maps
    pub fn ngf(&self) -> i64 {
        self.generator.config().base_filters
    }

    /// Get discriminator feature maps
    pub fn ndf(&self) -> i64 {
        self.discriminator.config().base_filters
    }

    /// Interpolate linearly between two latent vectors
    ///
    /// # Arguments
    ///
    /// * `z1` - First latent vector, shape (latent_dim,)
    /// * `z2` - Second latent vector, shape (latent_dim,)
    /// * `steps` - Number of interpolation steps (at least 2)
    ///
    /// # Returns
    ///
    /// Tensor of shape (steps, channels, 64, 64)
    pub fn interpolate(&self, z1: &Tensor, z2: &Tensor, steps: i64) -> Tensor {
        let steps = steps.max(2);
        let latents: Vec<Tensor> = (0..steps)
            .map(|i| {
                let alpha = i as f64 / (steps - 1) as f64;
                z1 * (1.0 - alpha) + z2 * alpha
            })
            .collect();

        let z = Tensor::stack(&latents, 0);
        self.generate_from_noise(&z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> DCGAN {
        DCGAN::with_defaults(16, 8, 8, 3, Device::Cpu)
    }

    #[test]
    fn test_dcgan_creation() {
        let dcgan = tiny();

        assert_eq!(dcgan.latent_dim(), 16);
        assert_eq!(dcgan.channels(), 3);
        assert_eq!(dcgan.ngf(), 8);
        assert_eq!(dcgan.ndf(), 8);
    }

    #[test]
    fn test_dcgan_generate() {
        let dcgan = tiny();

        let samples = dcgan.generate(4);
        assert_eq!(samples.size(), vec![4, 3, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn test_dcgan_discriminate() {
        let dcgan = tiny();

        let samples = dcgan.generate(3);
        let probs = dcgan.discriminate(&samples);

        assert_eq!(probs.size(), vec![3]);
    }

    #[test]
    fn test_dcgan_interpolate() {
        let dcgan = tiny();

        let z1 = Tensor::randn([16], (Kind::Float, Device::Cpu));
        let z2 = Tensor::randn([16], (Kind::Float, Device::Cpu));

        let interpolated = dcgan.interpolate(&z1, &z2, 5);
        assert_eq!(interpolated.size(), vec![5, 3, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn test_dcgan_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let gen_path = dir.path().join("generator.pt");
        let disc_path = dir.path().join("discriminator.pt");

        let dcgan = tiny();
        dcgan.save(&gen_path, &disc_path).unwrap();

        let mut other = tiny();
        other.load(&gen_path, &disc_path).unwrap();

        let noise = dcgan.sample_noise(2);
        let a = dcgan.generate_from_noise(&noise);
        let b = other.generate_from_noise(&noise);
        assert!(a.allclose(&b, 1e-5, 1e-6, false));
    }
}
