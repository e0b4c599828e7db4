//! Image preprocessing for GAN training
//!
//! Every image goes through the same fixed pipeline:
//! - Resize so the shorter side equals `image_size` (aspect ratio kept)
//! - Center crop to `image_size x image_size`
//! - Convert to CHW floats in [0, 1]
//! - Normalize per channel to [-1, 1] (matches the generator's tanh output)

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array3;

/// Fixed resize / crop / normalize pipeline
#[derive(Debug, Clone)]
pub struct ImageTransform {
    /// Output height and width
    pub image_size: u32,
    /// 3 for RGB, 1 for grayscale
    pub channels: usize,
    /// Per-channel mean subtracted after scaling to [0, 1]
    pub mean: Vec<f32>,
    /// Per-channel standard deviation
    pub std: Vec<f32>,
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::new(64, 3)
    }
}

impl ImageTransform {
    /// Create the standard DCGAN transform (mean = std = 0.5 per channel)
    pub fn new(image_size: u32, channels: usize) -> Self {
        Self {
            image_size,
            channels,
            mean: vec![0.5; channels],
            std: vec![0.5; channels],
        }
    }

    /// Apply the whole pipeline
    ///
    /// # Returns
    ///
    /// Array of shape (channels, image_size, image_size)
    pub fn apply(&self, img: &DynamicImage) -> Array3<f32> {
        let resized = self.resize_shorter_side(img);
        let cropped = self.center_crop(&resized);
        let mut pixels = self.to_chw(&cropped);
        self.normalize(&mut pixels);
        pixels
    }

    /// Resize so that the shorter side equals `image_size`
    pub fn resize_shorter_side(&self, img: &DynamicImage) -> DynamicImage {
        let (w, h) = (img.width(), img.height());
        let size = self.image_size;

        if w.min(h) == size {
            return img.clone();
        }

        let (new_w, new_h) = if w <= h {
            let scaled = (h as f64 * size as f64 / w as f64) as u32;
            (size, scaled.max(size))
        } else {
            let scaled = (w as f64 * size as f64 / h as f64) as u32;
            (scaled.max(size), size)
        };

        img.resize_exact(new_w, new_h, FilterType::Triangle)
    }

    /// Crop the central `image_size x image_size` square
    pub fn center_crop(&self, img: &DynamicImage) -> DynamicImage {
        let size = self.image_size;
        // Half-pixel offsets round to even
        let left = ((img.width().saturating_sub(size)) as f64 / 2.0).round_ties_even() as u32;
        let top = ((img.height().saturating_sub(size)) as f64 / 2.0).round_ties_even() as u32;
        img.crop_imm(left, top, size, size)
    }

    /// Convert to a CHW float array in [0, 1]
    fn to_chw(&self, img: &DynamicImage) -> Array3<f32> {
        let size = self.image_size as usize;
        let mut out = Array3::<f32>::zeros((self.channels, size, size));

        if self.channels == 1 {
            let gray = img.to_luma8();
            for (x, y, p) in gray.enumerate_pixels() {
                out[[0, y as usize, x as usize]] = p[0] as f32 / 255.0;
            }
        } else {
            let rgb = img.to_rgb8();
            for (x, y, p) in rgb.enumerate_pixels() {
                for c in 0..3 {
                    out[[c, y as usize, x as usize]] = p[c] as f32 / 255.0;
                }
            }
        }

        out
    }

    /// x = (x - mean) / std, per channel
    pub fn normalize(&self, pixels: &mut Array3<f32>) {
        for (c, mut plane) in pixels.outer_iter_mut().enumerate() {
            let (mean, std) = (self.mean[c], self.std[c]);
            plane.mapv_inplace(|v| (v - mean) / std);
        }
    }

    /// Undo `normalize` and clamp back to [0, 1]
    pub fn denormalize(&self, pixels: &mut Array3<f32>) {
        for (c, mut plane) in pixels.outer_iter_mut().enumerate() {
            let (mean, std) = (self.mean[c], self.std[c]);
            plane.mapv_inplace(|v| (v * std + mean).clamp(0.0, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_resize_keeps_aspect_ratio() {
        let transform = ImageTransform::new(64, 3);
        let resized = transform.resize_shorter_side(&solid(200, 100, [0, 0, 0]));

        assert_eq!(resized.height(), 64);
        assert_eq!(resized.width(), 128);
    }

    #[test]
    fn test_output_shape() {
        let transform = ImageTransform::new(32, 3);
        let out = transform.apply(&solid(50, 80, [10, 20, 30]));

        assert_eq!(out.shape(), &[3, 32, 32]);
    }

    #[test]
    fn test_normalized_range() {
        let transform = ImageTransform::new(16, 3);

        let white = transform.apply(&solid(16, 16, [255, 255, 255]));
        assert!(white.iter().all(|&v| (v - 1.0).abs() < 1e-6));

        let black = transform.apply(&solid(16, 16, [0, 0, 0]));
        assert!(black.iter().all(|&v| (v + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_center_crop_picks_middle() {
        // Left half red, right half blue; the crop must contain both
        let mut img = RgbImage::from_pixel(40, 20, Rgb([255, 0, 0]));
        for x in 20..40 {
            for y in 0..20 {
                img.put_pixel(x, y, Rgb([0, 0, 255]));
            }
        }
        let transform = ImageTransform::new(20, 3);
        let out = transform.apply(&DynamicImage::ImageRgb8(img));

        assert!(out[[0, 10, 0]] > 0.9);
        assert!(out[[2, 10, 19]] > 0.9);
    }

    #[test]
    fn test_center_crop_odd_margin() {
        // One spare column: the crop starts at 0, keeping the red edge
        let mut img = RgbImage::from_pixel(65, 64, Rgb([0, 0, 255]));
        for y in 0..64 {
            img.put_pixel(0, y, Rgb([255, 0, 0]));
        }
        let transform = ImageTransform::new(64, 3);
        let cropped = transform.center_crop(&DynamicImage::ImageRgb8(img.clone()));
        assert_eq!(cropped.width(), 64);

        let out = transform.apply(&DynamicImage::ImageRgb8(img));
        assert!(out[[0, 5, 0]] > 0.9);
        assert!(out[[2, 5, 63]] > 0.9);

        // Three spare columns: 1.5 rounds to 2, dropping both red columns
        let mut wide = RgbImage::from_pixel(67, 64, Rgb([0, 0, 255]));
        for y in 0..64 {
            wide.put_pixel(0, y, Rgb([255, 0, 0]));
            wide.put_pixel(1, y, Rgb([255, 0, 0]));
        }
        let out = transform.apply(&DynamicImage::ImageRgb8(wide));
        assert!(out[[0, 5, 0]] < -0.9);
    }

    #[test]
    fn test_grayscale() {
        let transform = ImageTransform::new(8, 1);
        let out = transform.apply(&solid(8, 8, [255, 255, 255]));

        assert_eq!(out.shape(), &[1, 8, 8]);
    }

    #[test]
    fn test_denormalize_inverts() {
        let transform = ImageTransform::new(8, 3);
        let mut out = transform.apply(&solid(8, 8, [255, 0, 255]));
        transform.denormalize(&mut out);

        assert!((out[[0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!(out[[1, 0, 0]].abs() < 1e-6);
    }
}
