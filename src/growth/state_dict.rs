use ndarray::{ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::Result;

/// An owned, serializable copy of a single tensor in row major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ParamTensor {
    pub fn from_view(view: ArrayViewD<f32>) -> Self {
        Self {
            shape: view.shape().to_vec(),
            data: view.iter().copied().collect(),
        }
    }

    /// A 0d tensor, used for the non-trainable scales.
    pub fn scalar(value: f32) -> Self {
        Self {
            shape: vec![],
            data: vec![value],
        }
    }

    /// Views the raw data with its shape.
    ///
    /// # Returns
    /// An error if `data` doesn't hold exactly the amount of elements `shape` describes.
    pub fn view(&self) -> Result<ArrayViewD<'_, f32>> {
        Ok(ArrayViewD::from_shape(IxDyn(&self.shape), &self.data)?)
    }
}

/// The ordered, named snapshot of every stored value of a network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDict {
    entries: Vec<(String, ParamTensor)>,
}

impl StateDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, tensor: ParamTensor) {
        self.entries.push((name.into(), tensor));
    }

    pub fn get(&self, name: &str) -> Option<&ParamTensor> {
        self.entries
            .iter()
            .find_map(|(n, tensor)| (n == name).then_some(tensor))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamTensor)> {
        self.entries.iter().map(|(name, tensor)| (name.as_str(), tensor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    #[test]
    fn tensors_keep_their_layout() {
        let array = Array2::from_shape_vec((2, 3), vec![1., 2., 3., 4., 5., 6.]).unwrap();
        let tensor = ParamTensor::from_view(array.t().into_dyn());

        assert_eq!(tensor.shape, [3, 2]);
        assert_eq!(tensor.data, [1., 4., 2., 5., 3., 6.]);
        assert_eq!(tensor.view().unwrap(), array.t().into_dyn());
    }

    #[test]
    fn inconsistent_tensor_fails_to_view() {
        let tensor = ParamTensor {
            shape: vec![2, 2],
            data: vec![1.],
        };

        assert!(tensor.view().is_err());
    }

    #[test]
    fn json_keeps_the_order() {
        let mut dict = StateDict::new();
        dict.push("stage_1.1.weight", ParamTensor::from_view(Array2::ones((2, 2)).view().into_dyn()));
        dict.push("stage_1.1.scale", ParamTensor::scalar(0.5));

        let parsed = StateDict::from_json(&dict.to_json().unwrap()).unwrap();

        assert_eq!(parsed, dict);
        assert_eq!(parsed.names().collect::<Vec<_>>(), ["stage_1.1.weight", "stage_1.1.scale"]);
        assert_eq!(parsed.get("stage_1.1.scale").unwrap().data, [0.5]);
    }
}
