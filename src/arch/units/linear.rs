use ndarray::{Array1, Array2, Array4, ArrayView4, ArrayViewMut1, ArrayViewMut2};
use rand::Rng;

use super::equalize;
use crate::{
    GanErr, Result,
    initialization::{Gain, RandParamGen},
};

/// An affine unit with an equalized learning rate, see `EqualizedConv2d`.
///
/// Its input is flattened to `(N, C * H * W)` and its output is kept 4d as `(N, out, 1, 1)`
/// so it can be chained with the rest of the units of a block.
#[derive(Clone, Debug)]
pub struct EqualizedLinear {
    weight: Array2<f32>,
    bias: Array1<f32>,
    scale: f32,
}

impl EqualizedLinear {
    /// Creates a new `EqualizedLinear` with freshly sampled weights and zero biases.
    ///
    /// # Arguments
    /// * `rng` - The random number generator used to sample the weights.
    /// * `in_features` - The amount of input features.
    /// * `out_features` - The amount of output features.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        let param_gen = RandParamGen::kaiming_normal(in_features, Gain::Linear)?;
        let weight = param_gen.sample(rng, (out_features, in_features));
        let (weight, scale) = equalize(weight);

        Ok(Self {
            weight,
            bias: Array1::zeros(out_features),
            scale,
        })
    }

    pub fn weight(&self) -> &Array2<f32> {
        &self.weight
    }

    pub fn bias(&self) -> &Array1<f32> {
        &self.bias
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Gives mutable access to every stored value of this unit at once.
    pub fn params_mut(&mut self) -> (ArrayViewMut2<'_, f32>, ArrayViewMut1<'_, f32>, &mut f32) {
        (self.weight.view_mut(), self.bias.view_mut(), &mut self.scale)
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let (n, c, h, w) = x.dim();
        let (out_features, in_features) = self.weight.dim();

        if c * h * w != in_features {
            return Err(GanErr::SizeMismatch {
                what: "linear input features",
                got: c * h * w,
                expected: in_features,
            });
        }

        let x = x.to_shape((n, in_features))?.mapv(|v| v * self.scale);
        let mut y = x.dot(&self.weight.t());
        y += &self.bias;

        Ok(y.into_shape_with_order((n, out_features, 1, 1))?)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn flattens_the_input() {
        let linear = EqualizedLinear::new(&mut StdRng::seed_from_u64(42), 8, 1).unwrap();
        let x = Array4::ones((3, 2, 2, 2));

        let y = linear.forward(x.view()).unwrap();
        assert_eq!(y.dim(), (3, 1, 1, 1));

        let expected = linear.weight().sum() * linear.scale();
        assert!(y.iter().all(|v| (v - expected).abs() < 1e-5));
    }

    #[test]
    fn feature_mismatch_fails() {
        let linear = EqualizedLinear::new(&mut StdRng::seed_from_u64(42), 8, 1).unwrap();
        let x = Array4::ones((1, 3, 1, 1));

        assert!(linear.forward(x.view()).is_err());
    }
}
