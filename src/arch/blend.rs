use ndarray::{Array4, ArrayView4, Zip};

use super::Block;
use crate::{GanErr, Result};

/// An ordered list of named blocks evaluated one after the other.
#[derive(Clone, Debug, Default)]
pub struct Branch {
    blocks: Vec<(String, Block)>,
}

impl Branch {
    pub fn new<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = (S, Block)>,
        S: Into<String>,
    {
        Self {
            blocks: blocks
                .into_iter()
                .map(|(name, block)| (name.into(), block))
                .collect(),
        }
    }

    pub fn blocks(&self) -> &[(String, Block)] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [(String, Block)] {
        &mut self.blocks
    }

    pub fn into_blocks(self) -> Vec<(String, Block)> {
        self.blocks
    }

    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut y = x.to_owned();
        for (_, block) in &self.blocks {
            y = block.forward(y.view())?;
        }

        Ok(y)
    }
}

/// Evaluates two branches on the same input, yielding an `(old, new)` pair that must be
/// consumed by a `Blend`.
#[derive(Clone, Debug)]
pub struct DualBranch {
    old: Branch,
    new: Branch,
}

impl DualBranch {
    pub fn new(old: Branch, new: Branch) -> Self {
        Self { old, new }
    }

    pub fn old(&self) -> &Branch {
        &self.old
    }

    pub fn new_branch(&self) -> &Branch {
        &self.new
    }

    pub fn branches_mut(&mut self) -> (&mut Branch, &mut Branch) {
        (&mut self.old, &mut self.new)
    }

    pub fn into_branches(self) -> (Branch, Branch) {
        (self.old, self.new)
    }

    /// Evaluates both branches independently, in parallel.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<(Array4<f32>, Array4<f32>)> {
        let (old, new) = rayon::join(|| self.old.forward(x), || self.new.forward(x));
        Ok((old?, new?))
    }
}

/// Linearly interpolates an `(old, new)` pair: `old * (1 - blend_factor) + new * blend_factor`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blend {
    blend_factor: f32,
}

impl Default for Blend {
    fn default() -> Self {
        Self { blend_factor: 0. }
    }
}

impl Blend {
    /// Creates a new `Blend`, `blend_factor` is clamped to `[0, 1]`.
    pub fn new(blend_factor: f32) -> Self {
        Self {
            blend_factor: blend_factor.clamp(0., 1.),
        }
    }

    pub fn blend_factor(&self) -> f32 {
        self.blend_factor
    }

    /// Sets `blend_factor = clamp(blend_factor + delta, 0, 1)`.
    ///
    /// # Returns
    /// The updated blend factor or an error if `delta` is NaN.
    pub fn update(&mut self, delta: f32) -> Result<f32> {
        if delta.is_nan() {
            return Err(GanErr::InvalidBlendDelta(delta));
        }

        self.blend_factor = (self.blend_factor + delta).clamp(0., 1.);
        Ok(self.blend_factor)
    }

    pub fn forward(&self, (mut old, new): (Array4<f32>, Array4<f32>)) -> Result<Array4<f32>> {
        if old.dim() != new.dim() {
            return Err(GanErr::SizeMismatch {
                what: "blended branch elements",
                got: new.len(),
                expected: old.len(),
            });
        }

        let alpha = self.blend_factor;
        Zip::from(&mut old)
            .and(&new)
            .for_each(|o, &n| *o = *o * (1. - alpha) + n * alpha);

        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::units::Unit;

    fn pair() -> (Array4<f32>, Array4<f32>) {
        let old = Array4::from_shape_fn((2, 1, 2, 2), |(n, _, h, w)| (n + h + w) as f32);
        let new = Array4::from_shape_fn((2, 1, 2, 2), |(n, _, h, w)| -((n * h + w) as f32) - 1.);
        (old, new)
    }

    #[test]
    fn endpoints_select_a_single_branch() {
        let (old, new) = pair();

        assert_eq!(Blend::new(0.).forward((old.clone(), new.clone())).unwrap(), old);
        assert_eq!(Blend::new(1.).forward((old.clone(), new.clone())).unwrap(), new);
    }

    #[test]
    fn blending_is_monotonic() {
        let (old, new) = pair();
        let factors = [0., 0.1, 0.25, 0.5, 0.9, 1.];

        let outputs: Vec<_> = factors
            .iter()
            .map(|&a| Blend::new(a).forward((old.clone(), new.clone())).unwrap())
            .collect();

        for w in outputs.windows(2) {
            // `new < old` everywhere, so every step moves strictly towards `new`.
            Zip::from(&w[0]).and(&w[1]).for_each(|a, b| assert!(b < a));
        }

        for y in &outputs[1..outputs.len() - 1] {
            Zip::from(y)
                .and(&old)
                .and(&new)
                .for_each(|&y, &o, &n| assert!(n < y && y < o));
        }
    }

    #[test]
    fn update_clamps() {
        let mut blend = Blend::default();

        assert_eq!(blend.update(0.3).unwrap(), 0.3);
        assert_eq!(blend.update(5.).unwrap(), 1.);
        assert_eq!(blend.update(-0.25).unwrap(), 0.75);
        assert_eq!(blend.update(-2.).unwrap(), 0.);
        assert!(blend.update(f32::NAN).is_err());
        assert_eq!(blend.blend_factor(), 0.);
    }

    #[test]
    fn shape_mismatch_fails() {
        let old = Array4::zeros((1, 1, 2, 2));
        let new = Array4::zeros((1, 1, 4, 4));

        assert!(Blend::new(0.5).forward((old, new)).is_err());
    }

    #[test]
    fn dual_branch_evaluates_both_branches_on_the_same_input() {
        let old = Branch::new([("resample", Block::new([Unit::upsample()]))]);
        let new = Branch::new([("identity", Block::default())]);
        let dual = DualBranch::new(old, new);
        let x = Array4::from_shape_fn((1, 1, 2, 2), |(_, _, h, w)| (h * 2 + w) as f32);

        let (a, b) = dual.forward(x.view()).unwrap();
        assert_eq!(a.dim(), (1, 1, 4, 4));
        assert_eq!(b, x);
    }
}
