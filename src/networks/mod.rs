mod discriminator;
mod generator;

pub use discriminator::Discriminator;
pub use generator::Generator;

use log::debug;
use ndarray::{ArrayViewD, ArrayViewMutD};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    GanErr, Result,
    growth::{GrowthObserver, GrowthState, Registry, StateDict},
};

mod sealed {
    use crate::growth::Registry;

    /// Mutable access to a network's registry, only reachable from inside the crate.
    pub trait RegistryOwner {
        fn registry_mut(&mut self) -> &mut Registry;
    }
}

/// A network that grows one resolution stage at a time.
///
/// The growth goes through two steps: `grow` installs the next stage next to the current
/// one and fades it in as the blend factor goes from 0 to 1, `flush` then drops the previous
/// stage's terminal block for good.
pub trait Progressive: sealed::RegistryOwner {
    /// Returns where the network is in its growth.
    fn state(&self) -> GrowthState;

    fn registry(&self) -> &Registry;

    /// Adds the next stage to the network and starts fading it in with a blend factor of 0.
    ///
    /// # Errors
    /// `StageOutOfRange` if the network already has every stage, `AlreadyTransitioning` if a
    /// previous growth was not flushed. The network is left unchanged on error.
    fn grow(&mut self) -> Result<()>;

    /// Makes the stage being faded in permanent and drops the previous terminal block.
    ///
    /// The blend factor is not checked, flushing before it reaches 1 is up to the caller.
    ///
    /// # Errors
    /// `NotTransitioning` if there is nothing to flush.
    fn flush(&mut self) -> Result<()>;

    /// Registers an observer notified after every `grow` and `flush`.
    fn subscribe(&mut self, observer: Box<dyn GrowthObserver + Send>);

    /// Adds `delta` to the blend factor of the current transition, the result is clamped to
    /// `[0, 1]`.
    ///
    /// # Returns
    /// The new blend factor or an error if the network is not transitioning.
    fn update_blend_factor(&mut self, delta: f32) -> Result<f32> {
        let kind = self.state().kind;
        let blend = self
            .registry_mut()
            .blend_mut()
            .ok_or(GanErr::NotTransitioning)?;

        let blend_factor = blend.update(delta)?;
        debug!(network = kind.as_str(), blend_factor = blend_factor; "blend factor updated");
        Ok(blend_factor)
    }

    /// Returns the ordered top level block names.
    fn block_names(&self) -> Vec<String> {
        self.registry()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn named_parameters(&self) -> Vec<(String, ArrayViewD<'_, f32>)> {
        self.registry().named_parameters()
    }

    fn named_parameters_mut(&mut self) -> Vec<(String, ArrayViewMutD<'_, f32>)> {
        self.registry_mut().named_parameters_mut()
    }

    fn state_dict(&self) -> StateDict {
        self.registry().state_dict()
    }

    fn load_state_dict(&mut self, dict: &StateDict) -> Result<()> {
        self.registry_mut().load_state_dict(dict)
    }
}

/// Builds the random number generator a network draws its weights from.
fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
