//! Data module for loading image folders
//!
//! This module provides:
//! - Image folder dataset with a fixed resize/crop/normalize pipeline
//! - DataLoader for batching images
//! - Grid export for visual inspection of samples

mod dataset;
mod grid;
mod loader;
mod transform;

pub use dataset::{is_image_file, ImageFolder, IMAGE_EXTENSIONS};
pub use grid::{make_grid, normalize_to_unit, save_grid, save_image};
pub use loader::{batch_to_tensor, DataLoader, DataLoaderIter};
pub use transform::ImageTransform;
