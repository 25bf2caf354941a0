use rand::Rng;

use crate::{
    GanErr, Result,
    arch::{Block, units::Unit},
    config::nf,
};

const LEAKY_SLOPE: f32 = 0.2;
const STDDEV_GROUP: usize = 4;

/// Pushes a convolution followed by a leaky relu and, optionally, a pixel norm.
fn conv_block<R: Rng + ?Sized>(
    units: &mut Vec<Unit>,
    rng: &mut R,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    padding: usize,
    pixel_norm: bool,
) -> Result<()> {
    units.push(Unit::conv(rng, in_channels, out_channels, kernel_size, 1, padding)?);
    units.push(Unit::leaky_relu(LEAKY_SLOPE));

    if pixel_norm {
        units.push(Unit::pixel_norm());
    }

    Ok(())
}

/// Builds the blocks of a generator.
#[derive(Clone, Copy, Debug)]
pub struct GeneratorBlocks {
    pub channels: usize,
    pub latent_dim: usize,
    pub total_stages: usize,
}

impl GeneratorBlocks {
    /// The block of stage 1, maps a `(N, latent_dim, 1, 1)` noise to `(N, nf(1), 4, 4)`.
    pub fn first_block<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Block> {
        let mut units = vec![Unit::pixel_norm()];
        conv_block(&mut units, rng, self.latent_dim, nf(1), 4, 3, true)?;
        conv_block(&mut units, rng, nf(1), nf(1), 3, 1, true)?;
        Ok(Block::new(units))
    }

    /// Maps `channels` feature maps to the output image channels.
    pub fn to_output_block<R: Rng + ?Sized>(&self, rng: &mut R, channels: usize) -> Result<Block> {
        Ok(Block::new([Unit::conv(rng, channels, self.channels, 1, 1, 0)?]))
    }

    /// The block of a stage after the first, doubles the resolution.
    ///
    /// # Arguments
    /// * `rng` - The random number generator the weights are drawn from.
    /// * `stage` - The stage, must be in `(1, total_stages]`.
    pub fn intermediate_block<R: Rng + ?Sized>(&self, rng: &mut R, stage: usize) -> Result<Block> {
        if stage <= 1 || stage > self.total_stages {
            return Err(GanErr::StageOutOfRange {
                stage,
                min: 2,
                max: self.total_stages,
            });
        }

        let s = stage as i32;
        let mut units = vec![Unit::upsample()];
        conv_block(&mut units, rng, nf(s - 1), nf(s), 3, 1, true)?;
        conv_block(&mut units, rng, nf(s), nf(s), 3, 1, true)?;
        Ok(Block::new(units))
    }
}

/// Builds the blocks of a discriminator.
#[derive(Clone, Copy, Debug)]
pub struct DiscriminatorBlocks {
    pub channels: usize,
    pub total_stages: usize,
}

impl DiscriminatorBlocks {
    /// Maps the input image channels to `channels` feature maps.
    pub fn from_input_block<R: Rng + ?Sized>(&self, rng: &mut R, channels: usize) -> Result<Block> {
        let mut units = Vec::with_capacity(2);
        conv_block(&mut units, rng, self.channels, channels, 1, 0, false)?;
        Ok(Block::new(units))
    }

    /// The block of the last stage, reduces `(N, nf(8 - total_stages), 4, 4)` to one score per
    /// sample shaped `(N, 1, 1, 1)`.
    pub fn last_block<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Block> {
        let ndim = nf(8 - self.total_stages as i32);

        let mut units = vec![Unit::minibatch_stddev(STDDEV_GROUP)];
        conv_block(&mut units, rng, ndim + 1, ndim, 3, 1, false)?;
        conv_block(&mut units, rng, ndim, ndim, 4, 0, false)?;
        units.push(Unit::linear(rng, ndim, 1)?);
        Ok(Block::new(units))
    }

    /// The block of a stage before the last, halves the resolution.
    ///
    /// # Arguments
    /// * `rng` - The random number generator the weights are drawn from.
    /// * `stage` - The stage, must be in `[1, total_stages)`.
    pub fn intermediate_block<R: Rng + ?Sized>(&self, rng: &mut R, stage: usize) -> Result<Block> {
        if stage < 1 || stage >= self.total_stages {
            return Err(GanErr::StageOutOfRange {
                stage,
                min: 1,
                max: self.total_stages.saturating_sub(1),
            });
        }

        let s = stage as i32;
        let mut units = Vec::with_capacity(5);
        conv_block(&mut units, rng, nf(8 - s), nf(8 - s), 3, 1, false)?;
        conv_block(&mut units, rng, nf(8 - s), nf(7 - s), 3, 1, false)?;
        units.push(Unit::downsample());
        Ok(Block::new(units))
    }
}
