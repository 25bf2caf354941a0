use ndarray::{
    Array1, Array2, Array3, Array4, ArrayView3, ArrayView4, ArrayViewMut1, ArrayViewMut4, Axis,
    linalg, stack,
};
use rand::Rng;
use rayon::prelude::*;

use super::equalize;
use crate::{
    GanErr, Result,
    initialization::{Gain, RandParamGen},
};

/// A 2d convolution with an equalized learning rate.
///
/// The weights are stored divided by `scale` and the input is multiplied by `scale` on every
/// forward pass, so the effective transform is the one given by the Kaiming initialization
/// while the stored weights stay near unit variance.
///
/// Optimizations:
///   1. The im2col buffer is reallocated for every sample on every call.
#[derive(Clone, Debug)]
pub struct EqualizedConv2d {
    weight: Array4<f32>,
    bias: Array1<f32>,
    scale: f32,
    stride: usize,
    padding: usize,
}

impl EqualizedConv2d {
    /// Creates a new `EqualizedConv2d` with freshly sampled weights and zero biases.
    ///
    /// # Arguments
    /// * `rng` - The random number generator used to sample the weights.
    /// * `in_channels` - The amount of channels of the input.
    /// * `out_channels` - The amount of channels of the output.
    /// * `kernel_size` - The side of the square kernel.
    /// * `stride` - The step between two consecutive kernel applications.
    /// * `padding` - The amount of zeros added on every side of the input.
    ///
    /// # Returns
    /// A new `EqualizedConv2d` or an error if any of the dimensions is zero.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
    ) -> Result<Self> {
        if stride == 0 || out_channels == 0 {
            return Err(GanErr::InvalidConfig(
                "convolutions need a stride and an output width greater than 0",
            ));
        }

        let fan_in = in_channels * kernel_size * kernel_size;
        let param_gen = RandParamGen::kaiming_normal(fan_in, Gain::Conv2d)?;
        let weight = param_gen.sample(rng, (out_channels, in_channels, kernel_size, kernel_size));
        let (weight, scale) = equalize(weight);

        Ok(Self {
            weight,
            bias: Array1::zeros(out_channels),
            scale,
            stride,
            padding,
        })
    }

    pub fn weight(&self) -> &Array4<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Gives mutable access to every stored value of this unit at once.
    pub fn params_mut(&mut self) -> (ArrayViewMut4<'_, f32>, ArrayViewMut1<'_, f32>, &mut f32) {
        (self.weight.view_mut(), self.bias.view_mut(), &mut self.scale)
    }

    /// Convolves every sample of `x`, samples are processed in parallel.
    ///
    /// # Arguments
    /// * `x` - The input with shape `(N, C_in, H, W)`.
    ///
    /// # Returns
    /// The output with shape `(N, C_out, H_out, W_out)` or an error if the input doesn't fit
    /// this convolution.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, channels, height, width) = x.dim();
        let (out_channels, in_channels, kh, kw) = self.weight.dim();

        if channels != in_channels {
            return Err(GanErr::SizeMismatch {
                what: "convolution input channels",
                got: channels,
                expected: in_channels,
            });
        }

        let (padded_h, padded_w) = (height + 2 * self.padding, width + 2 * self.padding);
        if padded_h < kh || padded_w < kw {
            return Err(GanErr::SizeMismatch {
                what: "convolution padded input side",
                got: padded_h.min(padded_w),
                expected: kh,
            });
        }

        let out_h = (padded_h - kh) / self.stride + 1;
        let out_w = (padded_w - kw) / self.stride + 1;
        if n == 0 {
            return Ok(Array4::zeros((0, out_channels, out_h, out_w)));
        }

        let weight = self
            .weight
            .view()
            .into_shape_with_order((out_channels, in_channels * kh * kw))?;
        let bias = self.bias.view().insert_axis(Axis(1));

        let samples = x
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|xi| {
                let cols = self.im2col(xi, out_h, out_w);
                let mut z = Array2::zeros((out_channels, out_h * out_w));
                linalg::general_mat_mul(1.0, &weight, &cols, 0.0, &mut z);
                z += &bias;
                z.into_shape_with_order((out_channels, out_h, out_w))
            })
            .collect::<std::result::Result<Vec<Array3<f32>>, _>>()?;

        let views: Vec<_> = samples.iter().map(|sample| sample.view()).collect();
        Ok(stack(Axis(0), &views)?)
    }

    /// Unfolds a single `(C, H, W)` sample into a `(C * kh * kw, H_out * W_out)` matrix, where
    /// every column holds the receptive field of one output position. The input is scaled by
    /// `scale` while unfolding.
    fn im2col(&self, x: ArrayView3<f32>, out_h: usize, out_w: usize) -> Array2<f32> {
        let (_, height, width) = x.dim();
        let (_, _, kh, kw) = self.weight.dim();
        let (stride, padding, scale) = (self.stride, self.padding, self.scale);

        Array2::from_shape_fn((x.len_of(Axis(0)) * kh * kw, out_h * out_w), |(row, col)| {
            let (c, i, j) = (row / (kh * kw), (row / kw) % kh, row % kw);
            let (oy, ox) = (col / out_w, col % out_w);

            // Coordinates over the padded input.
            let (py, px) = (oy * stride + i, ox * stride + j);
            if py < padding || px < padding || py - padding >= height || px - padding >= width {
                return 0.;
            }

            x[[c, py - padding, px - padding]] * scale
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn stored_weights_have_unit_rms() {
        let conv = EqualizedConv2d::new(&mut seeded_rng(), 8, 16, 3, 1, 1).unwrap();

        let rms = conv.weight().mapv(|w| w.powi(2)).mean().unwrap().sqrt();
        assert!((rms - 1.).abs() < 1e-4);
        assert!(conv.bias().iter().all(|&b| b == 0.));
    }

    #[test]
    fn scale_is_close_to_kaiming_std_dev() {
        let conv = EqualizedConv2d::new(&mut seeded_rng(), 16, 32, 3, 1, 1).unwrap();

        let expected = 1. / (16. * 9f32).sqrt();
        assert!((conv.scale() - expected).abs() < expected * 0.05);
    }

    #[test]
    fn output_shapes() {
        let mut rng = seeded_rng();
        let x = Array4::ones((2, 4, 8, 8));

        let same = EqualizedConv2d::new(&mut rng, 4, 6, 3, 1, 1).unwrap();
        assert_eq!(same.forward(x.view()).unwrap().dim(), (2, 6, 8, 8));

        let valid = EqualizedConv2d::new(&mut rng, 4, 6, 4, 1, 0).unwrap();
        assert_eq!(valid.forward(x.view()).unwrap().dim(), (2, 6, 5, 5));

        let strided = EqualizedConv2d::new(&mut rng, 4, 6, 2, 2, 0).unwrap();
        assert_eq!(strided.forward(x.view()).unwrap().dim(), (2, 6, 4, 4));

        let latent = Array4::ones((3, 4, 1, 1));
        let expand = EqualizedConv2d::new(&mut rng, 4, 6, 4, 1, 3).unwrap();
        assert_eq!(expand.forward(latent.view()).unwrap().dim(), (3, 6, 4, 4));
    }

    #[test]
    fn pointwise_conv_matches_manual_computation() {
        let conv = EqualizedConv2d::new(&mut seeded_rng(), 2, 1, 1, 1, 0).unwrap();
        let x = Array4::from_shape_vec((1, 2, 1, 2), vec![1., 2., 3., 4.]).unwrap();

        let y = conv.forward(x.view()).unwrap();
        let (w0, w1, s) = (conv.weight()[[0, 0, 0, 0]], conv.weight()[[0, 1, 0, 0]], conv.scale());
        let expected = [w0 * s + w1 * 3. * s, w0 * 2. * s + w1 * 4. * s];

        for (got, expected) in y.iter().zip(expected) {
            assert!((got - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_padding_only_touches_the_border() {
        let mut conv = EqualizedConv2d::new(&mut seeded_rng(), 1, 1, 3, 1, 1).unwrap();
        let (mut weight, _, scale) = conv.params_mut();
        weight.fill(1.);
        *scale = 1.;

        let x = Array4::ones((1, 1, 3, 3));
        let y = conv.forward(x.view()).unwrap();

        assert_eq!(y[[0, 0, 0, 0]], 4.);
        assert_eq!(y[[0, 0, 0, 1]], 6.);
        assert_eq!(y[[0, 0, 1, 1]], 9.);
    }

    #[test]
    fn empty_batch() {
        let conv = EqualizedConv2d::new(&mut seeded_rng(), 4, 6, 4, 1, 3).unwrap();
        let x = Array4::zeros((0, 4, 1, 1));

        assert_eq!(conv.forward(x.view()).unwrap().dim(), (0, 6, 4, 4));
    }

    #[test]
    fn channel_mismatch_fails() {
        let conv = EqualizedConv2d::new(&mut seeded_rng(), 3, 2, 3, 1, 1).unwrap();
        let x = Array4::zeros((1, 4, 4, 4));

        assert!(matches!(
            conv.forward(x.view()),
            Err(GanErr::SizeMismatch { got: 4, expected: 3, .. })
        ));
    }

    #[test]
    fn same_seed_same_unit() {
        let a = EqualizedConv2d::new(&mut seeded_rng(), 3, 5, 3, 1, 1).unwrap();
        let b = EqualizedConv2d::new(&mut seeded_rng(), 3, 5, 3, 1, 1).unwrap();
        let x = Array4::from_shape_fn((2, 3, 4, 4), |(n, c, h, w)| (n + c * h) as f32 - w as f32);

        assert_eq!(a.scale(), b.scale());
        assert_eq!(a.forward(x.view()).unwrap(), b.forward(x.view()).unwrap());
    }
}
