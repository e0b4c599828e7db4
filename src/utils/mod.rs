//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Checkpoint save/load utilities
//! - Logging setup

mod checkpoint;
mod config;
mod logging;

pub use checkpoint::{
    find_latest_checkpoint, list_checkpoints, load_checkpoint, load_checkpoint_meta,
    model_from_checkpoint, save_checkpoint, CheckpointMeta, ModelMeta,
};
pub use config::{
    write_default_config, Config, DataConfig, DebugConfig, ModelConfig, TrainingConfigFile,
};
pub use logging::{setup_logging, verbosity_directive, verbosity_filter};
