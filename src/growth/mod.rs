mod factory;
mod observer;
mod registry;
mod state;
mod state_dict;

pub use factory::{DiscriminatorBlocks, GeneratorBlocks};
pub use observer::{GrowthEvent, GrowthObserver, Observers, Transition};
pub use registry::{Entry, Registry};
pub use state::{
    BLEND, DUAL_BRANCH, FROM_INPUT, GrowthState, Mode, NetworkKind, RESAMPLE, TO_OUTPUT,
    stage_name,
};
pub use state_dict::{ParamTensor, StateDict};
