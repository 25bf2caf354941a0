use ndarray::{Array4, ArrayView4, ArrayViewD, ArrayViewMutD};

use super::units::Unit;
use crate::Result;

/// An ordered sequence of units: information flows from the first unit to the last one.
#[derive(Clone, Debug, Default)]
pub struct Block {
    units: Vec<Unit>,
}

impl Block {
    /// Creates a new `Block`.
    ///
    /// # Arguments
    /// * `units` - The units the block is composed of.
    ///
    /// # Returns
    /// A new `Block` instance.
    pub fn new<I>(units: I) -> Self
    where
        I: IntoIterator<Item = Unit>,
    {
        Self {
            units: units.into_iter().collect(),
        }
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Makes a forward pass through every unit of the block.
    ///
    /// # Arguments
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The output of the last unit, a copy of `x` if the block is empty, or an error if any unit
    /// rejected its input.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let Some((first, rest)) = self.units.split_first() else {
            return Ok(x.to_owned());
        };

        let mut y = first.forward(x)?;
        for unit in rest {
            y = unit.forward(y.view())?;
        }

        Ok(y)
    }

    /// Returns the trainable tensors of the block named `<unit index>.<field>`.
    pub fn params(&self) -> Vec<(String, ArrayViewD<'_, f32>)> {
        self.units
            .iter()
            .enumerate()
            .flat_map(|(i, unit)| {
                unit.params()
                    .into_iter()
                    .map(move |(field, param)| (format!("{i}.{field}"), param))
            })
            .collect()
    }

    pub fn params_mut(&mut self) -> Vec<(String, ArrayViewMutD<'_, f32>)> {
        self.units
            .iter_mut()
            .enumerate()
            .flat_map(|(i, unit)| {
                unit.params_mut()
                    .into_iter()
                    .map(move |(field, param)| (format!("{i}.{field}"), param))
            })
            .collect()
    }

    /// Returns the input scales of the equalized units named `<unit index>.scale`.
    pub fn scales(&self) -> Vec<(String, f32)> {
        self.units
            .iter()
            .enumerate()
            .filter_map(|(i, unit)| Some((format!("{i}.scale"), unit.scale()?)))
            .collect()
    }

    pub fn scales_mut(&mut self) -> Vec<(String, &mut f32)> {
        self.units
            .iter_mut()
            .enumerate()
            .filter_map(|(i, unit)| Some((format!("{i}.scale"), unit.scale_mut()?)))
            .collect()
    }
}
