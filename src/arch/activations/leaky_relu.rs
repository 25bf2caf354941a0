use ndarray::{Array4, ArrayView4};

/// The leaky rectifier used after every convolution of both networks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LeakyRelu {
    slope: f32,
}

impl Default for LeakyRelu {
    fn default() -> Self {
        Self { slope: 0.2 }
    }
}

impl LeakyRelu {
    pub fn new(slope: f32) -> Self {
        Self { slope }
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }

    pub fn f(&self, z: f32) -> f32 {
        if z > 0. { z } else { self.slope * z }
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Array4<f32> {
        x.mapv(|z| self.f(z))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    #[test]
    fn negative_values_are_scaled() {
        let act = LeakyRelu::default();
        let x = Array4::from_shape_vec((1, 1, 1, 4), vec![-1., -0.5, 0., 2.]).unwrap();

        let y = act.forward(x.view());
        assert_eq!(y.into_raw_vec_and_offset().0, [-0.2, -0.1, 0., 2.]);
    }
}
