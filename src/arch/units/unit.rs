use ndarray::{Array4, ArrayView4, ArrayViewD, ArrayViewMutD};
use rand::Rng;

use super::{
    Downsample, EqualizedConv2d, EqualizedLinear, MinibatchStddev, PixelNorm, Upsample,
};
use crate::{Result, arch::activations::LeakyRelu};

/// The smallest composable piece of a network.
#[derive(Clone, Debug)]
pub enum Unit {
    Conv(EqualizedConv2d),
    Linear(EqualizedLinear),
    LeakyRelu(LeakyRelu),
    PixelNorm(PixelNorm),
    MinibatchStddev(MinibatchStddev),
    Upsample(Upsample),
    Downsample(Downsample),
}

impl Unit {
    pub fn conv<R: Rng + ?Sized>(
        rng: &mut R,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
    ) -> Result<Self> {
        let conv = EqualizedConv2d::new(
            rng,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
        )?;

        Ok(Self::Conv(conv))
    }

    pub fn linear<R: Rng + ?Sized>(
        rng: &mut R,
        in_features: usize,
        out_features: usize,
    ) -> Result<Self> {
        Ok(Self::Linear(EqualizedLinear::new(rng, in_features, out_features)?))
    }

    pub fn leaky_relu(slope: f32) -> Self {
        Self::LeakyRelu(LeakyRelu::new(slope))
    }

    pub fn pixel_norm() -> Self {
        Self::PixelNorm(PixelNorm::new())
    }

    pub fn minibatch_stddev(group_size: usize) -> Self {
        Self::MinibatchStddev(MinibatchStddev::new(group_size))
    }

    pub fn upsample() -> Self {
        Self::Upsample(Upsample::new())
    }

    pub fn downsample() -> Self {
        Self::Downsample(Downsample::new())
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        match self {
            Self::Conv(u) => u.forward(x),
            Self::Linear(u) => u.forward(x),
            Self::LeakyRelu(u) => Ok(u.forward(x)),
            Self::PixelNorm(u) => u.forward(x),
            Self::MinibatchStddev(u) => u.forward(x),
            Self::Upsample(u) => Ok(u.forward(x)),
            Self::Downsample(u) => u.forward(x),
        }
    }

    /// Returns the trainable tensors of this unit by field name.
    pub fn params(&self) -> Vec<(&'static str, ArrayViewD<'_, f32>)> {
        match self {
            Self::Conv(u) => vec![
                ("weight", u.weight().view().into_dyn()),
                ("bias", u.bias().view().into_dyn()),
            ],
            Self::Linear(u) => vec![
                ("weight", u.weight().view().into_dyn()),
                ("bias", u.bias().view().into_dyn()),
            ],
            _ => vec![],
        }
    }

    /// Returns mutable views of the trainable tensors of this unit by field name.
    pub fn params_mut(&mut self) -> Vec<(&'static str, ArrayViewMutD<'_, f32>)> {
        match self {
            Self::Conv(u) => {
                let (weight, bias, _) = u.params_mut();
                vec![("weight", weight.into_dyn()), ("bias", bias.into_dyn())]
            }
            Self::Linear(u) => {
                let (weight, bias, _) = u.params_mut();
                vec![("weight", weight.into_dyn()), ("bias", bias.into_dyn())]
            }
            _ => vec![],
        }
    }

    /// The non-trainable input scale of the equalized units.
    pub fn scale(&self) -> Option<f32> {
        match self {
            Self::Conv(u) => Some(u.scale()),
            Self::Linear(u) => Some(u.scale()),
            _ => None,
        }
    }

    pub fn scale_mut(&mut self) -> Option<&mut f32> {
        match self {
            Self::Conv(u) => Some(u.params_mut().2),
            Self::Linear(u) => Some(u.params_mut().2),
            _ => None,
        }
    }
}
