//! Assertion checks on tensors and variable stores

use tch::{nn::VarStore, Tensor};

use super::stats::TensorStats;
use crate::error::{DcganError, Result};

/// Fail if `tensor` contains NaN or infinite values
pub fn assert_finite(name: &str, tensor: &Tensor) -> Result<()> {
    let stats = TensorStats::of(tensor);
    if stats.is_finite() {
        Ok(())
    } else {
        Err(DcganError::assertion(
            name,
            format!(
                "{} NaN and {} infinite values in {:?}",
                stats.nan_count, stats.inf_count, stats.shape
            ),
        ))
    }
}

/// Fail unless `tensor` has exactly `expected` shape
///
/// A negative dimension in `expected` matches any size.
pub fn assert_shape(name: &str, tensor: &Tensor, expected: &[i64]) -> Result<()> {
    let actual = tensor.size();
    let matches = actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(&a, &e)| e < 0 || a == e);

    if matches {
        Ok(())
    } else {
        Err(DcganError::assertion(
            name,
            format!("expected shape {expected:?}, got {actual:?}"),
        ))
    }
}

/// Fail unless every finite value of `tensor` lies in `[lo, hi]`
pub fn assert_range(name: &str, tensor: &Tensor, lo: f64, hi: f64) -> Result<()> {
    let stats = TensorStats::of(tensor);
    if stats.numel == 0 || (stats.min >= lo && stats.max <= hi) {
        Ok(())
    } else {
        Err(DcganError::assertion(
            name,
            format!(
                "values span [{:.4}, {:.4}], outside [{lo}, {hi}]",
                stats.min, stats.max
            ),
        ))
    }
}

/// Fail unless every trainable variable has a defined, finite gradient
///
/// Only meaningful right after `backward()` and before `zero_grad()`.
pub fn assert_grads_present(name: &str, vs: &VarStore) -> Result<()> {
    let mut missing = Vec::new();
    let mut non_finite = Vec::new();

    let mut variables: Vec<(String, Tensor)> = vs
        .variables()
        .into_iter()
        .filter(|(_, v)| v.requires_grad())
        .collect();
    variables.sort_by(|a, b| a.0.cmp(&b.0));

    for (var_name, var) in variables {
        let grad = var.grad();
        if !grad.defined() {
            missing.push(var_name);
        } else if !TensorStats::of(&grad).is_finite() {
            non_finite.push(var_name);
        }
    }

    if missing.is_empty() && non_finite.is_empty() {
        return Ok(());
    }

    let mut message = String::new();
    if !missing.is_empty() {
        message.push_str(&format!("no gradient for [{}]", missing.join(", ")));
    }
    if !non_finite.is_empty() {
        if !message.is_empty() {
            message.push_str("; ");
        }
        message.push_str(&format!("non-finite gradient for [{}]", non_finite.join(", ")));
    }

    Err(DcganError::assertion(name, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn, nn::Module, Device, Kind};

    #[test]
    fn test_assert_finite() {
        let ok = Tensor::from_slice(&[0.5f32, -0.5]);
        assert!(assert_finite("ok", &ok).is_ok());

        let bad = Tensor::from_slice(&[0.5f32, f32::NAN]);
        let err = assert_finite("loss", &bad).unwrap_err();
        assert!(err.to_string().contains("loss"));
    }

    #[test]
    fn test_assert_shape_wildcard() {
        let t = Tensor::zeros([8, 3, 64, 64], (Kind::Float, Device::Cpu));

        assert!(assert_shape("batch", &t, &[-1, 3, 64, 64]).is_ok());
        assert!(assert_shape("batch", &t, &[8, 1, 64, 64]).is_err());
        assert!(assert_shape("batch", &t, &[8, 3, 64]).is_err());
    }

    #[test]
    fn test_assert_range() {
        let t = Tensor::from_slice(&[-1.0f32, 0.0, 1.0]);

        assert!(assert_range("x", &t, -1.0, 1.0).is_ok());
        assert!(assert_range("x", &t, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_assert_grads_present() {
        let vs = nn::VarStore::new(Device::Cpu);
        let linear = nn::linear(vs.root() / "fc", 4, 2, Default::default());

        // Before any backward pass no gradient exists
        assert!(assert_grads_present("fc", &vs).is_err());

        let xs = Tensor::randn([3, 4], (Kind::Float, Device::Cpu));
        linear.forward(&xs).sum(Kind::Float).backward();

        assert!(assert_grads_present("fc", &vs).is_ok());
    }
}
