use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;
use rand_distr::NormalError;

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, GanErr>;

/// The crate's error type.
///
/// Every variant except `Shape`, `Init` and `Config` is a precondition violation: the caller
/// asked for something the current network state does not allow. None of them are retried.
#[derive(Debug)]
pub enum GanErr {
    StageOutOfRange {
        stage: usize,
        min: usize,
        max: usize,
    },
    NotTransitioning,
    AlreadyTransitioning,
    InvalidInputRank {
        got: usize,
        expected: &'static [usize],
    },
    BatchNotDivisible {
        batch: usize,
        group: usize,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidTargetSize(usize),
    InvalidConfig(&'static str),
    UnpairedBranch,
    InvalidBlendDelta(f32),
    MissingBlock(&'static str),
    ParamShapeMismatch {
        name: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    UnknownParam(String),
    MissingParam(String),
    Shape(ShapeError),
    Init(String),
    Config(serde_json::Error),
}

impl Display for GanErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GanErr::StageOutOfRange { stage, min, max } => {
                write!(f, "stage {stage} is out of the valid range [{min}, {max}]")
            }
            GanErr::NotTransitioning => {
                write!(f, "the network is stable, there is no blend in progress")
            }
            GanErr::AlreadyTransitioning => write!(
                f,
                "the network is already blending a new stage, flush it before growing again"
            ),
            GanErr::InvalidInputRank { got, expected } => {
                write!(f, "invalid input rank {got}, expected one of {expected:?}")
            }
            GanErr::BatchNotDivisible { batch, group } => write!(
                f,
                "the batch size {batch} is not divisible by the minibatch group size {group}"
            ),
            GanErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "size mismatch for {what}, got {got} and expected {expected}"
            ),
            GanErr::InvalidTargetSize(size) => write!(
                f,
                "the target size {size} must be a power of two greater or equal to 4"
            ),
            GanErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            GanErr::UnpairedBranch => write!(
                f,
                "a dual branch must be immediately followed by a blend entry"
            ),
            GanErr::InvalidBlendDelta(delta) => {
                write!(f, "invalid blend factor delta {delta}")
            }
            GanErr::MissingBlock(name) => write!(f, "the registry has no {name} block"),
            GanErr::ParamShapeMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "parameter {name} has shape {got:?} but the network expects {expected:?}"
            ),
            GanErr::UnknownParam(name) => write!(f, "unknown parameter {name}"),
            GanErr::MissingParam(name) => write!(f, "missing parameter {name}"),
            GanErr::Shape(e) => write!(f, "shape error: {e}"),
            GanErr::Init(msg) => write!(f, "failed to initialize parameters: {msg}"),
            GanErr::Config(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for GanErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GanErr::Shape(e) => Some(e),
            GanErr::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for GanErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<NormalError> for GanErr {
    fn from(value: NormalError) -> Self {
        Self::Init(value.to_string())
    }
}

impl From<serde_json::Error> for GanErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}
