//! Error types for the DCGAN pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the library layer
#[derive(Error, Debug)]
pub enum DcganError {
    #[error("dataset root not found: {0}")]
    DatasetNotFound(PathBuf),

    #[error("no images found under {0}")]
    EmptyDataset(PathBuf),

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("index {index} out of range for dataset of {len} images")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("assertion failed on `{name}`: {message}")]
    Assertion { name: String, message: String },

    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DcganError {
    /// Build an assertion failure for the named tensor
    pub fn assertion(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Assertion {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DcganError>;
