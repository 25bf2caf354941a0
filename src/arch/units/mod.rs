mod conv;
mod linear;
mod minibatch_stddev;
mod pixel_norm;
mod resample;
mod unit;

pub use conv::EqualizedConv2d;
pub use linear::EqualizedLinear;
pub use minibatch_stddev::MinibatchStddev;
pub use pixel_norm::PixelNorm;
pub use resample::{Downsample, Upsample};
pub use unit::Unit;

use ndarray::{Array, Dimension};

/// Rescales freshly initialized weights to unit root mean square.
///
/// # Returns
/// The rescaled weights and `scale = sqrt(mean(w^2))`, the constant the equalized units
/// multiply their input by. A zero `scale` leaves the weights untouched.
fn equalize<D: Dimension>(mut weight: Array<f32, D>) -> (Array<f32, D>, f32) {
    let scale = weight
        .mapv(|w| w.powi(2))
        .mean()
        .unwrap_or_default()
        .sqrt();

    if scale > 0. {
        weight.mapv_inplace(|w| w / scale);
    }

    (weight, scale)
}
