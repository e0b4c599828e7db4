//! Model module containing GAN architecture components
//!
//! This module provides:
//! - Generator network mapping latent noise to 64x64 images
//! - Discriminator network for distinguishing real from fake
//! - DCGAN weight initialization
//! - DCGAN wrapper combining both networks

mod dcgan;
mod discriminator;
mod generator;
mod init;

pub use dcgan::{DCGAN, IMAGE_SIZE};
pub use discriminator::{leaky_relu, Discriminator, DiscriminatorConfig, LEAKY_SLOPE};
pub use generator::{Generator, GeneratorConfig};
pub use init::{init_weights, INIT_STD};
