use std::collections::HashSet;

use ndarray::{Array4, ArrayView4, ArrayViewD, ArrayViewMutD};

use super::{ParamTensor, StateDict};
use crate::{
    GanErr, Result,
    arch::{Blend, Block, DualBranch},
};

/// A top level entry of the registry.
#[derive(Clone, Debug)]
pub enum Entry {
    Block(Block),
    DualBranch(DualBranch),
    Blend(Blend),
}

/// The named, ordered blocks a network is made of.
///
/// The order is the evaluation order and also the order of the exported parameter names.
/// A `DualBranch` entry is always immediately followed by the `Blend` entry that consumes its
/// output pair.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    entries: Vec<(String, Entry)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, entry: Entry) {
        self.entries.push((name.into(), entry));
    }

    /// Moves every entry of `other` to the end of this registry.
    pub(crate) fn append(&mut self, mut other: Registry) {
        self.entries.append(&mut other.entries);
    }

    pub fn entries(&self) -> &[(String, Entry)] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find_map(|(n, entry)| (n == name).then_some(entry))
    }

    /// Removes the block named `name` from the registry.
    ///
    /// # Returns
    /// The removed block, or `None` if there is no block with that name, in which case the
    /// registry is left untouched.
    pub(crate) fn take_block(&mut self, name: &str) -> Option<Block> {
        let pos = self
            .entries
            .iter()
            .position(|(n, entry)| n == name && matches!(entry, Entry::Block(_)))?;

        match self.entries.remove(pos) {
            (_, Entry::Block(block)) => Some(block),
            _ => None,
        }
    }

    /// Removes the `DualBranch` and `Blend` pair from the registry.
    ///
    /// # Returns
    /// The removed dual branch, or `None` if there is no transition in progress, in which case
    /// the registry is left untouched.
    pub(crate) fn take_transition(&mut self) -> Option<DualBranch> {
        let dual = self
            .entries
            .iter()
            .position(|(_, entry)| matches!(entry, Entry::DualBranch(_)))?;

        if !matches!(self.entries.get(dual + 1), Some((_, Entry::Blend(_)))) {
            return None;
        }

        self.entries.remove(dual + 1);
        match self.entries.remove(dual) {
            (_, Entry::DualBranch(dual)) => Some(dual),
            _ => None,
        }
    }

    pub fn blend(&self) -> Option<&Blend> {
        self.entries.iter().find_map(|(_, entry)| match entry {
            Entry::Blend(blend) => Some(blend),
            _ => None,
        })
    }

    pub(crate) fn blend_mut(&mut self) -> Option<&mut Blend> {
        self.entries.iter_mut().find_map(|(_, entry)| match entry {
            Entry::Blend(blend) => Some(blend),
            _ => None,
        })
    }

    /// Makes a forward pass through every entry.
    ///
    /// # Arguments
    /// * `x` - The input data.
    ///
    /// # Returns
    /// The output of the last entry or an error if any entry rejected its input.
    pub fn forward(&self, x: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut y = x.to_owned();
        let mut entries = self.entries.iter();

        while let Some((_, entry)) = entries.next() {
            y = match entry {
                Entry::Block(block) => block.forward(y.view())?,
                Entry::DualBranch(dual) => {
                    let pair = dual.forward(y.view())?;
                    let Some((_, Entry::Blend(blend))) = entries.next() else {
                        return Err(GanErr::UnpairedBranch);
                    };

                    blend.forward(pair)?
                }
                Entry::Blend(_) => return Err(GanErr::UnpairedBranch),
            };
        }

        Ok(y)
    }

    /// Lists every block with its full name, the blocks of a dual branch are named
    /// `<entry>.<old|new>.<block>`.
    pub fn blocks(&self) -> Vec<(String, &Block)> {
        let mut blocks = Vec::new();

        for (name, entry) in &self.entries {
            match entry {
                Entry::Block(block) => blocks.push((name.clone(), block)),
                Entry::DualBranch(dual) => {
                    for (tag, branch) in [("old", dual.old()), ("new", dual.new_branch())] {
                        for (block_name, block) in branch.blocks() {
                            blocks.push((format!("{name}.{tag}.{block_name}"), block));
                        }
                    }
                }
                Entry::Blend(_) => {}
            }
        }

        blocks
    }

    pub fn blocks_mut(&mut self) -> Vec<(String, &mut Block)> {
        let mut blocks = Vec::new();

        for (name, entry) in &mut self.entries {
            match entry {
                Entry::Block(block) => blocks.push((name.clone(), block)),
                Entry::DualBranch(dual) => {
                    let (old, new) = dual.branches_mut();
                    for (tag, branch) in [("old", old), ("new", new)] {
                        for (block_name, block) in branch.blocks_mut() {
                            blocks.push((format!("{name}.{tag}.{block_name}"), block));
                        }
                    }
                }
                Entry::Blend(_) => {}
            }
        }

        blocks
    }

    /// Returns every trainable tensor named `<block>.<unit index>.<field>`.
    pub fn named_parameters(&self) -> Vec<(String, ArrayViewD<'_, f32>)> {
        self.blocks()
            .into_iter()
            .flat_map(|(prefix, block)| {
                block
                    .params()
                    .into_iter()
                    .map(move |(name, param)| (format!("{prefix}.{name}"), param))
            })
            .collect()
    }

    pub fn named_parameters_mut(&mut self) -> Vec<(String, ArrayViewMutD<'_, f32>)> {
        self.blocks_mut()
            .into_iter()
            .flat_map(|(prefix, block)| {
                block
                    .params_mut()
                    .into_iter()
                    .map(move |(name, param)| (format!("{prefix}.{name}"), param))
            })
            .collect()
    }

    /// Copies every stored value, trainable parameters and scales, into a `StateDict`.
    pub fn state_dict(&self) -> StateDict {
        let mut dict = StateDict::new();

        for (prefix, block) in self.blocks() {
            for (name, param) in block.params() {
                dict.push(format!("{prefix}.{name}"), ParamTensor::from_view(param));
            }

            for (name, scale) in block.scales() {
                dict.push(format!("{prefix}.{name}"), ParamTensor::scalar(scale));
            }
        }

        dict
    }

    /// Overwrites every stored value with the ones in `dict`.
    ///
    /// The load is strict: `dict` must hold exactly the names this registry exports, each with
    /// the same shape. Nothing is modified if the validation fails.
    pub fn load_state_dict(&mut self, dict: &StateDict) -> Result<()> {
        let current = self.state_dict();

        for (name, tensor) in current.iter() {
            let src = dict
                .get(name)
                .ok_or_else(|| GanErr::MissingParam(name.to_string()))?;

            if src.shape != tensor.shape || src.data.len() != tensor.data.len() {
                return Err(GanErr::ParamShapeMismatch {
                    name: name.to_string(),
                    got: src.shape.clone(),
                    expected: tensor.shape.clone(),
                });
            }
        }

        let known: HashSet<&str> = current.names().collect();
        if let Some(name) = dict.names().find(|name| !known.contains(name)) {
            return Err(GanErr::UnknownParam(name.to_string()));
        }

        for (prefix, block) in self.blocks_mut() {
            for (name, mut param) in block.params_mut() {
                if let Some(src) = dict.get(&format!("{prefix}.{name}")) {
                    param.assign(&src.view()?);
                }
            }

            for (name, scale) in block.scales_mut() {
                if let Some(&value) = dict
                    .get(&format!("{prefix}.{name}"))
                    .and_then(|src| src.data.first())
                {
                    *scale = value;
                }
            }
        }

        Ok(())
    }
}
