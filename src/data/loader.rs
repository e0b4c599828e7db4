//! DataLoader for batching and iterating over an image folder
//!
//! Provides batching for GAN training with support for:
//! - Random shuffling (re-shuffled every epoch)
//! - Drop last incomplete batch
//! - Parallel decoding of each batch on a rayon pool

use ndarray::{Array4, Axis};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use tch::{Device, Tensor};

use super::dataset::ImageFolder;
use crate::error::{DcganError, Result};

/// DataLoader for iterating over batched images
pub struct DataLoader {
    dataset: ImageFolder,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    indices: Vec<usize>,
    current_idx: usize,
    rng: StdRng,
    pool: Option<rayon::ThreadPool>,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `dataset` - Image folder to draw from
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to shuffle data each epoch
    /// * `drop_last` - Whether to drop incomplete final batch
    pub fn new(dataset: ImageFolder, batch_size: usize, shuffle: bool, drop_last: bool) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();

        let mut loader = Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            drop_last,
            indices,
            current_idx: 0,
            rng: StdRng::from_entropy(),
            pool: None,
        };

        if shuffle {
            loader.shuffle_indices();
        }

        loader
    }

    /// Use a fixed seed for shuffling
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self.indices = (0..self.dataset.len()).collect();
        if self.shuffle {
            self.shuffle_indices();
        }
        self
    }

    /// Decode images on `workers` threads (0 keeps decoding on the caller)
    pub fn with_workers(mut self, workers: usize) -> Result<Self> {
        self.pool = if workers == 0 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| DcganError::Config(format!("failed to build worker pool: {e}")))?;
            Some(pool)
        };
        Ok(self)
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.dataset.len();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            num_samples.div_ceil(self.batch_size)
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Underlying dataset
    pub fn dataset(&self) -> &ImageFolder {
        &self.dataset
    }

    fn shuffle_indices(&mut self) {
        self.indices.shuffle(&mut self.rng);
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.shuffle_indices();
        }
    }

    /// Get next batch
    ///
    /// Returns `Ok(None)` when the epoch is complete
    pub fn next_batch(&mut self) -> Result<Option<Array4<f32>>> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return Ok(None);
        }

        let end = (start + self.batch_size).min(num_samples);

        if self.drop_last && end - start < self.batch_size {
            self.current_idx = num_samples;
            return Ok(None);
        }

        let batch = self.load_indices(&self.indices[start..end])?;
        self.current_idx = end;
        Ok(Some(batch))
    }

    /// Load specific dataset indices as one batch of shape (N, C, H, W)
    pub fn load_indices(&self, indices: &[usize]) -> Result<Array4<f32>> {
        let decode = || -> Result<Vec<_>> {
            indices
                .par_iter()
                .map(|&i| self.dataset.get(i))
                .collect()
        };

        let images = match &self.pool {
            Some(pool) => pool.install(decode)?,
            None => indices
                .iter()
                .map(|&i| self.dataset.get(i))
                .collect::<Result<Vec<_>>>()?,
        };

        let transform = self.dataset.transform();
        let size = transform.image_size as usize;
        let mut batch = Array4::<f32>::zeros((images.len(), transform.channels, size, size));
        for (i, img) in images.iter().enumerate() {
            batch.index_axis_mut(Axis(0), i).assign(img);
        }

        Ok(batch)
    }

    /// Iterate over all batches of one epoch
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Result<Array4<f32>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch().transpose()
    }
}

/// Copy a batch into a float tensor on `device`
pub fn batch_to_tensor(batch: &Array4<f32>, device: Device) -> Tensor {
    let shape: Vec<i64> = batch.shape().iter().map(|&d| d as i64).collect();
    let data: Vec<f32> = batch.iter().copied().collect();
    Tensor::from_slice(&data).view(shape.as_slice()).to_device(device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::write_images;
    use crate::data::ImageTransform;
    use tempfile::tempdir;

    fn loader_over(count: usize, batch_size: usize, drop_last: bool) -> (tempfile::TempDir, DataLoader) {
        let dir = tempdir().unwrap();
        write_images(dir.path(), "all", count, 10);
        let ds = ImageFolder::open(dir.path(), ImageTransform::new(8, 3)).unwrap();
        let loader = DataLoader::new(ds, batch_size, false, drop_last);
        (dir, loader)
    }

    #[test]
    fn test_dataloader_basic() {
        let (_dir, mut loader) = loader_over(10, 3, false);

        assert_eq!(loader.num_batches(), 4);
        assert_eq!(loader.num_samples(), 10);

        let mut batch_count = 0;
        while let Some(batch) = loader.next_batch().unwrap() {
            batch_count += 1;
            if batch_count < 4 {
                assert_eq!(batch.shape(), &[3, 3, 8, 8]);
            } else {
                assert_eq!(batch.shape()[0], 1);
            }
        }
        assert_eq!(batch_count, 4);
    }

    #[test]
    fn test_dataloader_drop_last() {
        let (_dir, mut loader) = loader_over(10, 3, true);

        assert_eq!(loader.num_batches(), 3);

        let batches: Vec<_> = loader.iter().collect::<Result<_>>().unwrap();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.shape()[0] == 3));
    }

    #[test]
    fn test_dataloader_workers_and_reset() {
        let (_dir, loader) = loader_over(6, 4, false);
        let mut loader = loader.with_workers(2).unwrap().with_seed(7);

        assert_eq!(loader.iter().count(), 2);
        // A second epoch yields the same number of batches
        assert_eq!(loader.iter().count(), 2);
    }

    #[test]
    fn test_batch_to_tensor() {
        let (_dir, mut loader) = loader_over(2, 2, false);
        let batch = loader.next_batch().unwrap().unwrap();
        let tensor = batch_to_tensor(&batch, Device::Cpu);

        assert_eq!(tensor.size(), vec![2, 3, 8, 8]);
        assert_eq!(tensor.kind(), tch::Kind::Float);
    }
}
