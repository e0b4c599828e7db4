//! DCGAN weight initialization
//!
//! Conv and transposed-conv weights ~ N(0, 0.02),
//! BatchNorm weights ~ N(1, 0.02), BatchNorm biases = 0.

use tch::nn::{Init, VarStore};

/// Standard deviation used for every initialized weight
pub const INIT_STD: f64 = 0.02;

/// Re-initialize every variable in `vs` following the DCGAN paper
///
/// Relies on the layer naming used by the generator and discriminator
/// (`convN.weight`, `bnN.weight`, `bnN.bias`). Returns the number of
/// variables that were re-initialized.
pub fn init_weights(vs: &VarStore) -> usize {
    let mut count = 0;

    for (name, mut var) in vs.variables() {
        let layer = name.rsplit('.').nth(1).unwrap_or("");
        let init = if layer.starts_with("conv") && name.ends_with(".weight") {
            Init::Randn {
                mean: 0.0,
                stdev: INIT_STD,
            }
        } else if layer.starts_with("bn") && name.ends_with(".weight") {
            Init::Randn {
                mean: 1.0,
                stdev: INIT_STD,
            }
        } else if layer.starts_with("bn") && name.ends_with(".bias") {
            Init::Const(0.0)
        } else {
            continue;
        };

        tch::no_grad(|| var.init(init));
        count += 1;
    }

    count
}
