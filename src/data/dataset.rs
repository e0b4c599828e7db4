//! Image folder dataset
//!
//! Follows the usual image-folder layout: `root/<class>/<image>`.
//! Images directly under `root` are accepted too and get the empty class.
//! Labels are kept for completeness; the GAN ignores them.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use tracing::debug;

use super::transform::ImageTransform;
use crate::error::{DcganError, Result};

/// File extensions recognised as images
pub const IMAGE_EXTENSIONS: [&str; 9] = [
    "jpg", "jpeg", "png", "bmp", "gif", "tif", "tiff", "webp", "ppm",
];

/// Dataset of image files under a root directory
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    samples: Vec<(PathBuf, usize)>,
    classes: Vec<String>,
    transform: ImageTransform,
}

impl ImageFolder {
    /// Scan `root` recursively for image files
    pub fn open(root: impl AsRef<Path>, transform: ImageTransform) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DcganError::DatasetNotFound(root));
        }

        let mut files = Vec::new();
        collect_images(&root, &mut files)?;
        files.sort();

        if files.is_empty() {
            return Err(DcganError::EmptyDataset(root));
        }

        let class_of = |path: &Path| -> String {
            let rel = path.strip_prefix(&root).unwrap_or(path);
            let mut components = rel.components();
            match (components.next(), components.next()) {
                (Some(first), Some(_)) => first.as_os_str().to_string_lossy().into_owned(),
                _ => String::new(),
            }
        };

        let classes: Vec<String> = files
            .iter()
            .map(|p| class_of(p))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let samples = files
            .into_iter()
            .map(|p| {
                let class = class_of(&p);
                let label = classes.binary_search(&class).unwrap_or(0);
                (p, label)
            })
            .collect::<Vec<_>>();

        debug!(
            "Indexed {} images in {} classes under {}",
            samples.len(),
            classes.len(),
            root.display()
        );

        Ok(Self {
            root,
            samples,
            classes,
            transform,
        })
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset holds no images
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load and transform the image at `index`
    ///
    /// # Returns
    ///
    /// Array of shape (channels, image_size, image_size) normalized to [-1, 1]
    pub fn get(&self, index: usize) -> Result<Array3<f32>> {
        let path = self.path(index)?;
        let img = image::open(path).map_err(|source| DcganError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.transform.apply(&img))
    }

    /// Path of the image at `index`
    pub fn path(&self, index: usize) -> Result<&Path> {
        self.samples
            .get(index)
            .map(|(p, _)| p.as_path())
            .ok_or(DcganError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Class label of the image at `index`
    pub fn label(&self, index: usize) -> Option<usize> {
        self.samples.get(index).map(|(_, label)| *label)
    }

    /// Sorted class names
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Transform applied to every image
    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }
}

fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_images(&path, out)?;
        } else if is_image_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

/// Check the extension against `IMAGE_EXTENSIONS` (case-insensitive)
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    /// Write `count` small images into `dir/<class>/`
    pub(crate) fn write_images(dir: &Path, class: &str, count: usize, size: u32) {
        let class_dir = dir.join(class);
        fs::create_dir_all(&class_dir).unwrap();
        for i in 0..count {
            let shade = (i * 40 % 256) as u8;
            let img = RgbImage::from_pixel(size, size + 4, Rgb([shade, 128, 255 - shade]));
            img.save(class_dir.join(format!("img_{i:03}.png"))).unwrap();
        }
    }

    #[test]
    fn test_open_collects_classes() {
        let dir = tempdir().unwrap();
        write_images(dir.path(), "cats", 3, 12);
        write_images(dir.path(), "dogs", 2, 12);
        fs::write(dir.path().join("cats/notes.txt"), "not an image").unwrap();

        let ds = ImageFolder::open(dir.path(), ImageTransform::new(8, 3)).unwrap();

        assert_eq!(ds.len(), 5);
        assert_eq!(ds.classes(), &["cats".to_string(), "dogs".to_string()]);
        assert_eq!(ds.label(0), Some(0));
        assert_eq!(ds.label(4), Some(1));
    }

    #[test]
    fn test_get_applies_transform() {
        let dir = tempdir().unwrap();
        write_images(dir.path(), "faces", 1, 20);

        let ds = ImageFolder::open(dir.path(), ImageTransform::new(8, 3)).unwrap();
        let img = ds.get(0).unwrap();

        assert_eq!(img.shape(), &[3, 8, 8]);
        assert!(img.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_missing_root() {
        let err = ImageFolder::open("/definitely/not/here", ImageTransform::default()).unwrap_err();
        assert!(matches!(err, DcganError::DatasetNotFound(_)));
    }

    #[test]
    fn test_empty_root() {
        let dir = tempdir().unwrap();
        let err = ImageFolder::open(dir.path(), ImageTransform::default()).unwrap_err();
        assert!(matches!(err, DcganError::EmptyDataset(_)));
    }

    #[test]
    fn test_index_out_of_range() {
        let dir = tempdir().unwrap();
        write_images(dir.path(), "a", 1, 8);
        let ds = ImageFolder::open(dir.path(), ImageTransform::new(8, 3)).unwrap();

        assert!(matches!(ds.get(3), Err(DcganError::IndexOutOfRange { index: 3, len: 1 })));
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a/b.JPG")));
        assert!(is_image_file(Path::new("x.png")));
        assert!(!is_image_file(Path::new("x.txt")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
