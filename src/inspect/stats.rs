//! Tensor summaries for printing during training

use std::fmt;

use tch::{Kind, Tensor};
use tracing::{debug, info};

/// Summary statistics of a tensor
#[derive(Debug, Clone, PartialEq)]
pub struct TensorStats {
    pub shape: Vec<i64>,
    pub numel: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub nan_count: i64,
    pub inf_count: i64,
}

impl TensorStats {
    /// Compute statistics without recording gradients
    ///
    /// Mean, std, min and max only consider finite entries.
    pub fn of(tensor: &Tensor) -> Self {
        tch::no_grad(|| {
            let t = tensor.detach().to_kind(Kind::Float);
            let shape = t.size();
            let numel = t.numel();

            let nan_count = t.isnan().sum(Kind::Int64).int64_value(&[]);
            let inf_count = t.isinf().sum(Kind::Int64).int64_value(&[]);

            let finite = t.masked_select(&t.isfinite());
            let (mean, std, min, max) = if finite.numel() == 0 {
                (f64::NAN, f64::NAN, f64::NAN, f64::NAN)
            } else {
                let std = if finite.numel() > 1 {
                    finite.std(true).double_value(&[])
                } else {
                    0.0
                };
                (
                    finite.mean(Kind::Float).double_value(&[]),
                    std,
                    finite.min().double_value(&[]),
                    finite.max().double_value(&[]),
                )
            };

            Self {
                shape,
                numel,
                mean,
                std,
                min,
                max,
                nan_count,
                inf_count,
            }
        })
    }

    /// No NaN and no infinite entries
    pub fn is_finite(&self) -> bool {
        self.nan_count == 0 && self.inf_count == 0
    }
}

impl fmt::Display for TensorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shape={:?} mean={:.4} std={:.4} min={:.4} max={:.4}",
            self.shape, self.mean, self.std, self.min, self.max
        )?;
        if !self.is_finite() {
            write!(f, " nan={} inf={}", self.nan_count, self.inf_count)?;
        }
        Ok(())
    }
}

/// Log a one-line summary of `tensor`
///
/// Non-finite tensors are always logged at info level.
pub fn print_tensor(name: &str, tensor: &Tensor) -> TensorStats {
    let stats = TensorStats::of(tensor);
    if stats.is_finite() {
        debug!("{name}: {stats}");
    } else {
        info!("{name}: {stats}");
    }
    stats
}
