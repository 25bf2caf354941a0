use ndarray::{Array4, ArrayView4};

use crate::{GanErr, Result};

/// Nearest neighbour upsampling with a scale factor of 2.
#[derive(Clone, Copy, Debug, Default)]
pub struct Upsample;

impl Upsample {
    pub fn new() -> Self {
        Self
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Array4<f32> {
        let (n, c, h, w) = x.dim();
        Array4::from_shape_fn((n, c, 2 * h, 2 * w), |(b, ch, row, col)| {
            x[[b, ch, row / 2, col / 2]]
        })
    }
}

/// Average pooling with a 2x2 kernel and a stride of 2.
#[derive(Clone, Copy, Debug, Default)]
pub struct Downsample;

impl Downsample {
    pub fn new() -> Self {
        Self
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = x.dim();

        if h < 2 || w < 2 {
            return Err(GanErr::SizeMismatch {
                what: "downsample input side",
                got: h.min(w),
                expected: 2,
            });
        }

        let out = Array4::from_shape_fn((n, c, h / 2, w / 2), |(b, ch, row, col)| {
            let (row, col) = (2 * row, 2 * col);
            let sum = x[[b, ch, row, col]]
                + x[[b, ch, row, col + 1]]
                + x[[b, ch, row + 1, col]]
                + x[[b, ch, row + 1, col + 1]];
            sum / 4.
        });

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample_repeats_pixels() {
        let x = Array4::from_shape_vec((1, 1, 2, 2), vec![1., 2., 3., 4.]).unwrap();

        let y = Upsample::new().forward(x.view());
        let expected = [
            1., 1., 2., 2., //
            1., 1., 2., 2., //
            3., 3., 4., 4., //
            3., 3., 4., 4., //
        ];
        assert_eq!(y.into_raw_vec_and_offset().0, expected);
    }

    #[test]
    fn downsample_averages_blocks() {
        let x = Array4::from_shape_fn((2, 3, 4, 4), |(n, c, h, w)| (n + c + h * 4 + w) as f32);

        let y = Downsample::new().forward(x.view()).unwrap();
        assert_eq!(y.dim(), (2, 3, 2, 2));
        assert_eq!(y[[0, 0, 0, 0]], (0. + 1. + 4. + 5.) / 4.);
        assert_eq!(y[[1, 2, 1, 1]], (13. + 14. + 17. + 18.) / 4.);
    }

    #[test]
    fn downsample_undoes_upsample() {
        let x = Array4::from_shape_fn((1, 2, 3, 3), |(_, c, h, w)| (c * 9 + h * 3 + w) as f32);

        let y = Downsample::new().forward(Upsample::new().forward(x.view()).view()).unwrap();
        assert_eq!(y, x);
    }

    #[test]
    fn downsample_too_small_fails() {
        let x = Array4::zeros((1, 1, 1, 1));
        assert!(Downsample::new().forward(x.view()).is_err());
    }
}
