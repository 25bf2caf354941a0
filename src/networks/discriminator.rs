use std::mem;

use log::{debug, info};
use ndarray::{Array2, ArrayViewD, Ix4};
use rand::rngs::StdRng;

use super::{Progressive, seeded_rng, sealed::RegistryOwner};
use crate::{
    GanErr, Result,
    arch::{Blend, Block, Branch, DualBranch, units::Unit},
    config::{NetworkConfig, nf},
    growth::{
        BLEND, DUAL_BRANCH, DiscriminatorBlocks, Entry, FROM_INPUT, GrowthEvent, GrowthObserver,
        GrowthState, Mode, NetworkKind, Observers, RESAMPLE, Registry, Transition, stage_name,
    },
};

/// Scores images, growing from 4x4 inputs up to the target size.
///
/// Mirrors the generator: it starts at stage `total_stages` and every growth decrements the
/// stage, prepending a block that accepts twice the previous resolution.
#[derive(Debug)]
pub struct Discriminator {
    blocks: DiscriminatorBlocks,
    current_stage: usize,
    registry: Registry,
    rng: StdRng,
    observers: Observers,
}

impl Discriminator {
    /// Creates a new `Discriminator` accepting 4x4 images.
    ///
    /// # Arguments
    /// * `config` - The network configuration.
    ///
    /// # Returns
    /// A new `Discriminator` or an error if the configuration is invalid.
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        config.validate()?;

        let total_stages = config.total_stages()?;
        let blocks = DiscriminatorBlocks {
            channels: config.channels,
            total_stages,
        };

        let mut rng = seeded_rng(config.seed);
        let from_input = blocks.from_input_block(&mut rng, nf(8 - total_stages as i32))?;
        let last = blocks.last_block(&mut rng)?;

        let mut registry = Registry::new();
        registry.push(FROM_INPUT, Entry::Block(from_input));
        registry.push(stage_name(total_stages), Entry::Block(last));

        debug!(channels = blocks.channels, total_stages = total_stages; "discriminator built");

        Ok(Self {
            blocks,
            current_stage: total_stages,
            registry,
            rng,
            observers: Observers::default(),
        })
    }

    pub fn total_stages(&self) -> usize {
        self.blocks.total_stages
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - Images shaped `(N, channels, resolution, resolution)`.
    ///
    /// # Returns
    /// One score per image, shaped `(N, 1)`.
    pub fn evaluate(&self, x: ArrayViewD<f32>) -> Result<Array2<f32>> {
        let got = x.ndim();
        let x = x
            .into_dimensionality::<Ix4>()
            .map_err(|_| GanErr::InvalidInputRank {
                got,
                expected: &[4],
            })?;

        let y = self.registry.forward(x)?;
        let (n, c, h, w) = y.dim();
        Ok(y.into_shape_with_order((n, c * h * w))?)
    }

    fn notify(&mut self, transition: Transition) {
        let event = GrowthEvent {
            transition,
            network: NetworkKind::Discriminator,
            stage: self.current_stage,
            total_stages: self.blocks.total_stages,
        };

        self.observers.notify(event);
    }
}

impl RegistryOwner for Discriminator {
    fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

impl Progressive for Discriminator {
    fn state(&self) -> GrowthState {
        let mode = match self.registry.blend() {
            Some(blend) => Mode::Transitioning {
                blend_factor: blend.blend_factor(),
            },
            None => Mode::Stable,
        };

        GrowthState {
            kind: NetworkKind::Discriminator,
            current_stage: self.current_stage,
            total_stages: self.blocks.total_stages,
            mode,
        }
    }

    fn registry(&self) -> &Registry {
        &self.registry
    }

    fn grow(&mut self) -> Result<()> {
        if self.registry.blend().is_some() {
            return Err(GanErr::AlreadyTransitioning);
        }

        if self.current_stage <= 1 {
            return Err(GanErr::StageOutOfRange {
                stage: 0,
                min: 1,
                max: self.blocks.total_stages,
            });
        }

        if self.registry.get(FROM_INPUT).is_none() {
            return Err(GanErr::MissingBlock(FROM_INPUT));
        }

        let stage = self.current_stage - 1;
        let from_input = self
            .blocks
            .from_input_block(&mut self.rng, nf(8 - stage as i32))?;
        let stage_block = self.blocks.intermediate_block(&mut self.rng, stage)?;

        let old_input = self
            .registry
            .take_block(FROM_INPUT)
            .ok_or(GanErr::MissingBlock(FROM_INPUT))?;

        let old = Branch::new([
            (RESAMPLE, Block::new([Unit::downsample()])),
            (FROM_INPUT, old_input),
        ]);
        let new = Branch::new([(FROM_INPUT.to_string(), from_input), (stage_name(stage), stage_block)]);

        let rest = mem::take(&mut self.registry);
        self.registry
            .push(DUAL_BRANCH, Entry::DualBranch(DualBranch::new(old, new)));
        self.registry.push(BLEND, Entry::Blend(Blend::new(0.)));
        self.registry.append(rest);
        self.current_stage = stage;

        info!(
            network = "discriminator",
            stage = stage,
            total_stages = self.blocks.total_stages;
            "growing network"
        );

        self.notify(Transition::Grow);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let dual = self
            .registry
            .take_transition()
            .ok_or(GanErr::NotTransitioning)?;

        let (_, new) = dual.into_branches();
        let rest = mem::take(&mut self.registry);
        for (name, block) in new.into_blocks() {
            self.registry.push(name, Entry::Block(block));
        }
        self.registry.append(rest);

        info!(network = "discriminator", stage = self.current_stage; "flushing network");

        self.notify(Transition::Flush);
        Ok(())
    }

    fn subscribe(&mut self, observer: Box<dyn GrowthObserver + Send>) {
        self.observers.push(observer);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, Array4};

    use super::*;

    fn config() -> NetworkConfig {
        NetworkConfig {
            channels: 3,
            latent_dim: 8,
            target_size: 8,
            seed: Some(42),
        }
    }

    #[test]
    fn starts_at_the_last_stage() {
        let discriminator = Discriminator::new(&config()).unwrap();

        let state = discriminator.state();
        assert_eq!(state.current_stage, 2);
        assert_eq!(state.resolution(), 4);
        assert_eq!(discriminator.block_names(), ["from_input", "stage_2"]);
    }

    #[test]
    fn scores_every_image() {
        let discriminator = Discriminator::new(&config()).unwrap();

        let x = Array4::from_elem((4, 3, 4, 4), 0.5);
        let scores = discriminator.evaluate(x.view().into_dyn()).unwrap();
        assert_eq!(scores.dim(), (4, 1));
    }

    #[test]
    fn rejects_non_image_input() {
        let discriminator = Discriminator::new(&config()).unwrap();

        let x = Array3::<f32>::zeros((3, 4, 4));
        assert!(matches!(
            discriminator.evaluate(x.view().into_dyn()),
            Err(GanErr::InvalidInputRank { got: 3, .. })
        ));
    }

    #[test]
    fn rejects_indivisible_batches() {
        let discriminator = Discriminator::new(&config()).unwrap();

        let x = Array4::from_elem((6, 3, 4, 4), 0.5);
        assert!(matches!(
            discriminator.evaluate(x.view().into_dyn()),
            Err(GanErr::BatchNotDivisible { batch: 6, group: 4 })
        ));
    }

    #[test]
    fn grow_and_flush() {
        let mut discriminator = Discriminator::new(&config()).unwrap();

        discriminator.grow().unwrap();
        assert_eq!(discriminator.block_names(), ["dual_branch", "blend", "stage_2"]);
        assert_eq!(discriminator.state().current_stage, 1);

        let x = Array4::from_elem((4, 3, 8, 8), 0.5);
        let scores = discriminator.evaluate(x.view().into_dyn()).unwrap();
        assert_eq!(scores.dim(), (4, 1));

        discriminator.update_blend_factor(1.).unwrap();
        discriminator.flush().unwrap();
        assert_eq!(discriminator.block_names(), ["from_input", "stage_1", "stage_2"]);
        assert_eq!(discriminator.block_names(), discriminator.state().block_names());
    }

    #[test]
    fn preconditions() {
        let mut discriminator = Discriminator::new(&config()).unwrap();

        assert!(matches!(discriminator.flush(), Err(GanErr::NotTransitioning)));

        discriminator.grow().unwrap();
        assert!(matches!(
            discriminator.grow(),
            Err(GanErr::AlreadyTransitioning)
        ));

        discriminator.flush().unwrap();
        assert!(matches!(
            discriminator.grow(),
            Err(GanErr::StageOutOfRange { .. })
        ));
        assert_eq!(discriminator.state().current_stage, 1);
    }
}
