use ndarray::{Array4, ArrayView4, Axis};

use crate::{GanErr, Result};

const EPSILON: f32 = 1e-8;

/// Normalizes the feature vector of every pixel to unit average magnitude.
#[derive(Clone, Copy, Debug, Default)]
pub struct PixelNorm;

impl PixelNorm {
    pub fn new() -> Self {
        Self
    }

    /// Computes `x / sqrt(mean(x^2, over channels) + 1e-8)`.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mean_sq = x
            .mapv(|v| v.powi(2))
            .mean_axis(Axis(1))
            .ok_or(GanErr::SizeMismatch {
                what: "pixel norm channels",
                got: 0,
                expected: 1,
            })?;

        let norm = mean_sq.mapv(|v| (v + EPSILON).sqrt()).insert_axis(Axis(1));
        Ok(&x / &norm)
    }
}
