use log::{debug, info};
use ndarray::{Array4, ArrayViewD};
use rand::rngs::StdRng;

use super::{Progressive, seeded_rng, sealed::RegistryOwner};
use crate::{
    GanErr, Result,
    arch::{Blend, Block, Branch, DualBranch, units::Unit},
    config::{NetworkConfig, nf},
    growth::{
        BLEND, DUAL_BRANCH, Entry, GeneratorBlocks, GrowthEvent, GrowthObserver, GrowthState,
        Mode, NetworkKind, Observers, RESAMPLE, Registry, TO_OUTPUT, Transition, stage_name,
    },
};

/// Maps latent noise to images, growing from 4x4 up to the target size.
///
/// The stages are added from coarse to fine: stage 1 outputs 4x4 images and every stage after
/// it doubles the resolution.
#[derive(Debug)]
pub struct Generator {
    blocks: GeneratorBlocks,
    current_stage: usize,
    registry: Registry,
    rng: StdRng,
    observers: Observers,
}

impl Generator {
    /// Creates a new `Generator` at stage 1.
    ///
    /// # Arguments
    /// * `config` - The network configuration.
    ///
    /// # Returns
    /// A new `Generator` or an error if the configuration is invalid.
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        config.validate()?;

        let blocks = GeneratorBlocks {
            channels: config.channels,
            latent_dim: config.latent_dim,
            total_stages: config.total_stages()?,
        };

        let mut rng = seeded_rng(config.seed);
        let mut registry = Registry::new();
        registry.push(stage_name(1), Entry::Block(blocks.first_block(&mut rng)?));
        registry.push(TO_OUTPUT, Entry::Block(blocks.to_output_block(&mut rng, nf(1))?));

        debug!(
            channels = blocks.channels,
            latent_dim = blocks.latent_dim,
            total_stages = blocks.total_stages;
            "generator built"
        );

        Ok(Self {
            blocks,
            current_stage: 1,
            registry,
            rng,
            observers: Observers::default(),
        })
    }

    pub fn latent_dim(&self) -> usize {
        self.blocks.latent_dim
    }

    pub fn total_stages(&self) -> usize {
        self.blocks.total_stages
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - Latent noise shaped `(N, latent_dim)` or `(N, latent_dim, 1, 1)`.
    ///
    /// # Returns
    /// The generated images shaped `(N, channels, resolution, resolution)`.
    pub fn evaluate(&self, x: ArrayViewD<f32>) -> Result<Array4<f32>> {
        let x = match *x.shape() {
            [n, nz] => x.to_shape((n, nz, 1, 1))?,
            [n, c, h, w] => x.to_shape((n, c, h, w))?,
            _ => {
                return Err(GanErr::InvalidInputRank {
                    got: x.ndim(),
                    expected: &[2, 4],
                });
            }
        };

        self.registry.forward(x.view())
    }

    fn notify(&mut self, transition: Transition) {
        let event = GrowthEvent {
            transition,
            network: NetworkKind::Generator,
            stage: self.current_stage,
            total_stages: self.blocks.total_stages,
        };

        self.observers.notify(event);
    }
}

impl RegistryOwner for Generator {
    fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}

impl Progressive for Generator {
    fn state(&self) -> GrowthState {
        let mode = match self.registry.blend() {
            Some(blend) => Mode::Transitioning {
                blend_factor: blend.blend_factor(),
            },
            None => Mode::Stable,
        };

        GrowthState {
            kind: NetworkKind::Generator,
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

        let stage = self.current_stage + 1;
        if stage > self.blocks.total_stages {
            return Err(GanErr::StageOutOfRange {
                stage,
                min: 1,
                max: self.blocks.total_stages,
            });
        }

        if self.registry.get(TO_OUTPUT).is_none() {
            return Err(GanErr::MissingBlock(TO_OUTPUT));
        }

        let stage_block = self.blocks.intermediate_block(&mut self.rng, stage)?;
        let to_output = self
            .blocks
            .to_output_block(&mut self.rng, nf(stage as i32))?;

        let old_output = self
            .registry
            .take_block(TO_OUTPUT)
            .ok_or(GanErr::MissingBlock(TO_OUTPUT))?;

        let old = Branch::new([
            (RESAMPLE, Block::new([Unit::upsample()])),
            (TO_OUTPUT, old_output),
        ]);
        let new = Branch::new([(stage_name(stage), stage_block), (TO_OUTPUT.to_string(), to_output)]);

        self.registry
            .push(DUAL_BRANCH, Entry::DualBranch(DualBranch::new(old, new)));
        self.registry.push(BLEND, Entry::Blend(Blend::new(0.)));
        self.current_stage = stage;

        info!(
            network = "generator",
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
        for (name, block) in new.into_blocks() {
            self.registry.push(name, Entry::Block(block));
        }

        info!(network = "generator", stage = self.current_stage; "flushing network");

        self.notify(Transition::Flush);
        Ok(())
    }

    fn subscribe(&mut self, observer: Box<dyn GrowthObserver + Send>) {
        self.observers.push(observer);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array4};

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
    fn starts_at_the_first_stage() {
        let generator = Generator::new(&config()).unwrap();

        let state = generator.state();
        assert_eq!(state.current_stage, 1);
        assert_eq!(state.total_stages, 2);
        assert_eq!(state.mode, Mode::Stable);
        assert_eq!(generator.block_names(), ["stage_1", "to_output"]);
    }

    #[test]
    fn accepts_flat_and_spatial_noise() {
        let generator = Generator::new(&config()).unwrap();

        let flat = Array2::from_elem((2, 8), 0.5);
        let spatial = Array4::from_elem((2, 8, 1, 1), 0.5);

        let y_flat = generator.evaluate(flat.view().into_dyn()).unwrap();
        let y_spatial = generator.evaluate(spatial.view().into_dyn()).unwrap();

        assert_eq!(y_flat.dim(), (2, 3, 4, 4));
        assert_eq!(y_flat, y_spatial);
    }

    #[test]
    fn empty_batch() {
        let generator = Generator::new(&config()).unwrap();

        let noise = Array2::<f32>::zeros((0, 8));
        let y = generator.evaluate(noise.view().into_dyn()).unwrap();
        assert_eq!(y.dim(), (0, 3, 4, 4));
    }

    #[test]
    fn rejects_other_ranks() {
        let generator = Generator::new(&config()).unwrap();

        let x = ndarray::Array3::<f32>::zeros((2, 8, 1));
        assert!(matches!(
            generator.evaluate(x.view().into_dyn()),
            Err(GanErr::InvalidInputRank { got: 3, .. })
        ));
    }

    #[test]
    fn grow_and_flush() {
        let mut generator = Generator::new(&config()).unwrap();

        generator.grow().unwrap();
        assert_eq!(generator.block_names(), ["stage_1", "dual_branch", "blend"]);
        assert_eq!(
            generator.state().mode,
            Mode::Transitioning { blend_factor: 0. }
        );

        let y = generator
            .evaluate(Array2::from_elem((2, 8), 0.5).view().into_dyn())
            .unwrap();
        assert_eq!(y.dim(), (2, 3, 8, 8));

        assert_eq!(generator.update_blend_factor(0.4).unwrap(), 0.4);
        assert_eq!(generator.update_blend_factor(2.).unwrap(), 1.);

        generator.flush().unwrap();
        assert_eq!(generator.block_names(), ["stage_1", "stage_2", "to_output"]);
        assert_eq!(generator.block_names(), generator.state().block_names());
    }

    #[test]
    fn preconditions() {
        let mut generator = Generator::new(&config()).unwrap();

        assert!(matches!(generator.flush(), Err(GanErr::NotTransitioning)));
        assert!(matches!(
            generator.update_blend_factor(0.1),
            Err(GanErr::NotTransitioning)
        ));

        generator.grow().unwrap();
        assert!(matches!(generator.grow(), Err(GanErr::AlreadyTransitioning)));

        generator.flush().unwrap();
        let before = generator.block_names();
        assert!(matches!(
            generator.grow(),
            Err(GanErr::StageOutOfRange { stage: 3, .. })
        ));
        assert_eq!(generator.block_names(), before);
    }

    #[test]
    fn invalid_config() {
        let config = NetworkConfig {
            target_size: 12,
            ..config()
        };

        assert!(matches!(
            Generator::new(&config),
            Err(GanErr::InvalidTargetSize(12))
        ));
    }
}
