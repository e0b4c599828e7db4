//! Image grids for visual inspection of generated samples

use std::path::Path;

use image::{GrayImage, RgbImage};
use tch::{Kind, Tensor};

/// Arrange a batch of images into a single grid image
///
/// # Arguments
///
/// * `images` - Tensor of shape (N, C, H, W)
/// * `nrow` - Number of images per grid row
/// * `padding` - Pixels of zero padding between and around images
///
/// # Returns
///
/// Tensor of shape (C, rows * (H + padding) + padding, nrow * (W + padding) + padding)
pub fn make_grid(images: &Tensor, nrow: i64, padding: i64) -> Tensor {
    let size = images.size();
    let (n, c, h, w) = (size[0], size[1], size[2], size[3]);

    let ncols = nrow.clamp(1, n.max(1));
    let nrows = (n + ncols - 1) / ncols;
    let cell_h = h + padding;
    let cell_w = w + padding;

    let grid = Tensor::zeros(
        [c, nrows * cell_h + padding, ncols * cell_w + padding],
        (images.kind(), images.device()),
    );

    for k in 0..n {
        let (row, col) = (k / ncols, k % ncols);
        let mut cell = grid
            .narrow(1, row * cell_h + padding, h)
            .narrow(2, col * cell_w + padding, w);
        cell.copy_(&images.get(k));
    }

    grid
}

/// Min-max scale to [0, 1] over the whole tensor
pub fn normalize_to_unit(tensor: &Tensor) -> Tensor {
    let t = tensor.to_kind(Kind::Float);
    let lo = t.min().double_value(&[]);
    let hi = t.max().double_value(&[]);
    if hi - lo > f64::EPSILON {
        (t - lo) / (hi - lo)
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Save a batch of images (N, C, H, W) as a PNG grid
///
/// Images are scaled to [0, 1] before padding, so the padding stays black.
pub fn save_grid(images: &Tensor, path: impl AsRef<Path>, nrow: i64) -> anyhow::Result<()> {
    let images = normalize_to_unit(&images.detach().to_device(tch::Device::Cpu));
    save_image(&make_grid(&images, nrow, 2), path)
}

/// Save a single (C, H, W) tensor with values in [0, 1] as an image
pub fn save_image(image: &Tensor, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let size = image.size();
    let (c, h, w) = (size[0], size[1] as u32, size[2] as u32);

    let bytes = (image.to_device(tch::Device::Cpu).clamp(0.0, 1.0) * 255.0)
        .round()
        .to_kind(Kind::Uint8)
        .permute([1, 2, 0])
        .contiguous()
        .flatten(0, -1);
    let raw: Vec<u8> = Vec::<u8>::try_from(&bytes)?;

    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }

    match c {
        1 => GrayImage::from_raw(w, h, raw)
            .ok_or_else(|| anyhow::anyhow!("grayscale buffer does not match {w}x{h}"))?
            .save(path.as_ref())?,
        3 => RgbImage::from_raw(w, h, raw)
            .ok_or_else(|| anyhow::anyhow!("rgb buffer does not match {w}x{h}"))?
            .save(path.as_ref())?,
        other => anyhow::bail!("cannot save image with {other} channels"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Device;
    use tempfile::tempdir;

    #[test]
    fn test_make_grid_shape() {
        let images = Tensor::ones([5, 3, 4, 4], (Kind::Float, Device::Cpu));
        let grid = make_grid(&images, 2, 2);

        // 3 rows x 2 cols of 4x4 images with 2px padding
        assert_eq!(grid.size(), vec![3, 3 * 6 + 2, 2 * 6 + 2]);
    }

    #[test]
    fn test_make_grid_padding_is_zero() {
        let images = Tensor::ones([2, 1, 3, 3], (Kind::Float, Device::Cpu));
        let grid = make_grid(&images, 2, 1);

        assert_eq!(grid.double_value(&[0, 0, 0]), 0.0);
        assert_eq!(grid.double_value(&[0, 1, 1]), 1.0);
        // 2 images * 9 pixels each
        assert_eq!(grid.sum(Kind::Float).double_value(&[]), 18.0);
    }

    #[test]
    fn test_normalize_to_unit() {
        let t = Tensor::from_slice(&[-1.0f32, 0.0, 1.0]);
        let n = normalize_to_unit(&t);

        assert_eq!(n.double_value(&[0]), 0.0);
        assert_eq!(n.double_value(&[2]), 1.0);
    }

    #[test]
    fn test_save_grid_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("samples/grid.png");
        let images = Tensor::rand([4, 3, 8, 8], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;

        save_grid(&images, &path, 2).unwrap();

        let loaded = image::open(&path).unwrap();
        assert_eq!(loaded.width(), 2 * 10 + 2);
        assert_eq!(loaded.height(), 2 * 10 + 2);
    }

    #[test]
    fn test_save_grid_keeps_padding_black() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.png");
        let images = Tensor::rand([4, 3, 8, 8], (Kind::Float, Device::Cpu)) * 0.6 + 0.2;

        save_grid(&images, &path, 2).unwrap();

        let loaded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(loaded.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(loaded.get_pixel(11, 11).0, [0, 0, 0]);

        // Samples span the full range once scaled on their own
        let max = loaded.pixels().flat_map(|p| p.0).max().unwrap();
        assert_eq!(max, 255);
    }
}
