//! Inspection and debugging of the networks during training
//!
//! This module provides:
//! - Graph scan and model summaries
//! - Tensor printing with summary statistics
//! - Assertion checks (finite values, shapes, ranges, gradients)
//! - Step hooks called by the trainer

mod assertions;
mod hooks;
mod stats;
mod summary;

pub use assertions::{assert_finite, assert_grads_present, assert_range, assert_shape};
pub use hooks::{NoopInspector, StepInspector, TracingInspector};
pub use stats::{print_tensor, TensorStats};
pub use summary::{model_summary, scan_graph, ParamInfo};
