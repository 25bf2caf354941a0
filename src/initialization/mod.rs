mod random;

pub use random::{Gain, RandParamGen};
