use ndarray::{Array, Dimension, ShapeBuilder};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Normal;

use crate::{GanErr, Result};

/// The recommended gain for each kind of layer, the value `calculate_gain` would return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gain {
    Conv2d,
    Linear,
    LeakyRelu { slope: f32 },
}

impl Gain {
    /// The numeric value of the gain.
    pub fn value(&self) -> f32 {
        match *self {
            Gain::Conv2d | Gain::Linear => 1.,
            Gain::LeakyRelu { slope } => (2. / (1. + slope.powi(2))).sqrt(),
        }
    }
}

/// A parameter generator that samples a whole tensor from a normal distribution.
pub struct RandParamGen {
    distribution: Normal<f32>,
}

impl RandParamGen {
    /// Creates a new `RandParamGen` with a normal distribution.
    ///
    /// # Arguments
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (NaN or infinite).
    pub fn normal(mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self {
            distribution: Normal::new(mean, std_dev)?,
        })
    }

    /// Creates a new `RandParamGen` using Kaiming normal initialization in `fan_in` mode.
    ///
    /// The layer's gain is used as the negative slope of the rectifier that follows it, so
    /// the standard deviation is `sqrt(2 / (1 + a^2)) / sqrt(fan_in)`.
    ///
    /// # Arguments
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `gain` - The gain of the layer being initialized.
    ///
    /// # Returns
    /// An error if `fan_in` is 0.
    pub fn kaiming_normal(fan_in: usize, gain: Gain) -> Result<Self> {
        if fan_in == 0 {
            return Err(GanErr::Init("kaiming initialization needs a fan_in > 0".into()));
        }

        let a = gain.value();
        let std_dev = (2. / (1. + a.powi(2))).sqrt() / (fan_in as f32).sqrt();
        Self::normal(0., std_dev)
    }

    /// Samples a tensor of the given shape.
    ///
    /// # Arguments
    /// * `rng` - The random number generator to sample with.
    /// * `shape` - The shape of the tensor.
    pub fn sample<R, Sh, D>(&self, rng: &mut R, shape: Sh) -> Array<f32, D>
    where
        R: Rng + ?Sized,
        Sh: ShapeBuilder<Dim = D>,
        D: Dimension,
    {
        Array::random_using(shape, self.distribution, rng)
    }
}
