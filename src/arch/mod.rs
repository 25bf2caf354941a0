pub mod activations;
mod blend;
mod block;
pub mod units;

pub use blend::{Blend, Branch, DualBranch};
pub use block::Block;
