use std::fmt::{self, Display};

pub const TO_OUTPUT: &str = "to_output";
pub const FROM_INPUT: &str = "from_input";
pub const DUAL_BRANCH: &str = "dual_branch";
pub const BLEND: &str = "blend";
pub const RESAMPLE: &str = "resample";

/// The canonical registry name of a stage's block.
pub fn stage_name(stage: usize) -> String {
    format!("stage_{stage}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKind {
    Generator,
    Discriminator,
}

impl NetworkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkKind::Generator => "generator",
            NetworkKind::Discriminator => "discriminator",
        }
    }
}

impl Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Stable,
    Transitioning { blend_factor: f32 },
}

/// A snapshot of where a network is in its growth.
///
/// The generator's `current_stage` goes from 1 up to `total_stages`, the discriminator's goes
/// from `total_stages` down to 1. While transitioning `current_stage` is already the stage
/// being blended in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthState {
    pub kind: NetworkKind,
    pub current_stage: usize,
    pub total_stages: usize,
    pub mode: Mode,
}

impl GrowthState {
    pub fn is_transitioning(&self) -> bool {
        matches!(self.mode, Mode::Transitioning { .. })
    }

    /// The side of the images the network produces or accepts at its current stage.
    pub fn resolution(&self) -> usize {
        let doublings = match self.kind {
            NetworkKind::Generator => self.current_stage - 1,
            NetworkKind::Discriminator => self.total_stages - self.current_stage,
        };

        4 << doublings
    }

    /// Computes the ordered top level block names a network in this state has.
    pub fn block_names(&self) -> Vec<String> {
        let (k, total) = (self.current_stage, self.total_stages);

        match (self.kind, self.is_transitioning()) {
            (NetworkKind::Generator, false) => (1..=k)
                .map(stage_name)
                .chain([TO_OUTPUT.to_string()])
                .collect(),
            (NetworkKind::Generator, true) => (1..k)
                .map(stage_name)
                .chain([DUAL_BRANCH.to_string(), BLEND.to_string()])
                .collect(),
            (NetworkKind::Discriminator, false) => [FROM_INPUT.to_string()]
                .into_iter()
                .chain((k..=total).map(stage_name))
                .collect(),
            (NetworkKind::Discriminator, true) => [DUAL_BRANCH.to_string(), BLEND.to_string()]
                .into_iter()
                .chain((k + 1..=total).map(stage_name))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(kind: NetworkKind, current_stage: usize, mode: Mode) -> GrowthState {
        GrowthState {
            kind,
            current_stage,
            total_stages: 4,
            mode,
        }
    }

    #[test]
    fn generator_names() {
        let stable = state(NetworkKind::Generator, 2, Mode::Stable);
        assert_eq!(stable.block_names(), ["stage_1", "stage_2", "to_output"]);
        assert_eq!(stable.resolution(), 8);

        let blending = state(NetworkKind::Generator, 3, Mode::Transitioning { blend_factor: 0. });
        assert_eq!(blending.block_names(), ["stage_1", "stage_2", "dual_branch", "blend"]);
        assert_eq!(blending.resolution(), 16);
    }

    #[test]
    fn discriminator_names() {
        let stable = state(NetworkKind::Discriminator, 3, Mode::Stable);
        assert_eq!(stable.block_names(), ["from_input", "stage_3", "stage_4"]);
        assert_eq!(stable.resolution(), 8);

        let blending =
            state(NetworkKind::Discriminator, 2, Mode::Transitioning { blend_factor: 0.5 });
        assert_eq!(blending.block_names(), ["dual_branch", "blend", "stage_3", "stage_4"]);
        assert_eq!(blending.resolution(), 16);
    }
}
