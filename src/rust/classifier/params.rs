//! Model parameters for the three linear layers, stored as a safetensors file.
//!
//! Tensor names follow the layer slots (`fc1.weight`, `fc1.bias`, ...), with
//! weights in `[out, in]` layout. The ordered category table may ride along
//! in the header metadata under [`CATEGORIES_METADATA_KEY`] as a JSON array.

use std::collections::HashMap;
use std::path::Path;

use log::info;
use ndarray::{Array1, Array2};
use safetensors::tensor::{Dtype, SafeTensors, TensorView};

use super::error::ClassifierError;

pub const CATEGORIES_METADATA_KEY: &str = "categories";

/// Weight and bias of a single linear layer.
#[derive(Debug, Clone)]
pub struct LinearParams {
    pub weight: Array2<f32>,
    pub bias: Array1<f32>,
}

impl LinearParams {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Self {
        Self { weight, bias }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }
}

/// The immutable parameter set the classifier network is built from.
#[derive(Debug, Clone)]
pub struct ModelParameters {
    pub fc1: LinearParams,
    pub fc2: LinearParams,
    pub fc3: LinearParams,
    /// Category table shipped with the weights, if the artifact carries one
    pub categories: Option<Vec<String>>,
}

impl ModelParameters {
    pub fn new(fc1: LinearParams, fc2: LinearParams, fc3: LinearParams) -> Self {
        Self {
            fc1,
            fc2,
            fc3,
            categories: None,
        }
    }

    pub fn with_categories(mut self, categories: Vec<impl Into<String>>) -> Self {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Loads parameters from a safetensors file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| ClassifierError::artifact(path, e))?;
        let params = Self::from_bytes(&bytes).map_err(|e| match e {
            ClassifierError::Artifact { message, .. } => ClassifierError::artifact(path, message),
            other => other,
        })?;
        info!(
            "Model parameters loaded from {:?}: {} → {} → {} → {}",
            path,
            params.fc1.in_features(),
            params.fc1.out_features(),
            params.fc2.out_features(),
            params.fc3.out_features()
        );
        Ok(params)
    }

    /// Decodes parameters from an in-memory safetensors buffer.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ClassifierError> {
        let tensors = SafeTensors::deserialize(bytes)
            .map_err(|e| ClassifierError::artifact("<safetensors>", e))?;
        let (_, metadata) = SafeTensors::read_metadata(bytes)
            .map_err(|e| ClassifierError::artifact("<safetensors>", e))?;

        let categories = match metadata
            .metadata()
            .as_ref()
            .and_then(|m| m.get(CATEGORIES_METADATA_KEY))
        {
            Some(raw) => Some(serde_json::from_str::<Vec<String>>(raw).map_err(|e| {
                ClassifierError::Configuration(format!("Invalid '{}' metadata: {}", CATEGORIES_METADATA_KEY, e))
            })?),
            None => None,
        };

        Ok(Self {
            fc1: read_linear(&tensors, "fc1")?,
            fc2: read_linear(&tensors, "fc2")?,
            fc3: read_linear(&tensors, "fc3")?,
            categories,
        })
    }

    /// Encodes the parameters (and category table, if set) as safetensors.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClassifierError> {
        let layers = [("fc1", &self.fc1), ("fc2", &self.fc2), ("fc3", &self.fc3)];
        let mut buffers: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::with_capacity(6);
        for (name, layer) in layers {
            buffers.push((
                format!("{}.weight", name),
                layer.weight.shape().to_vec(),
                to_le_bytes(layer.weight.iter()),
            ));
            buffers.push((
                format!("{}.bias", name),
                layer.bias.shape().to_vec(),
                to_le_bytes(layer.bias.iter()),
            ));
        }

        let views = buffers
            .iter()
            .map(|(name, shape, data)| {
                TensorView::new(Dtype::F32, shape.clone(), data)
                    .map(|view| (name.as_str(), view))
                    .map_err(|e| ClassifierError::Internal(format!("Failed to encode {}: {}", name, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let metadata = match &self.categories {
            Some(categories) => {
                let json = serde_json::to_string(categories)
                    .map_err(|e| ClassifierError::Internal(e.to_string()))?;
                Some(HashMap::from([(CATEGORIES_METADATA_KEY.to_string(), json)]))
            }
            None => None,
        };

        safetensors::serialize(views, &metadata)
            .map_err(|e| ClassifierError::Internal(format!("Failed to serialize parameters: {}", e)))
    }
}

fn to_le_bytes<'a>(values: impl Iterator<Item = &'a f32>) -> Vec<u8> {
    values.flat_map(|v| v.to_le_bytes()).collect()
}

fn read_f32(tensors: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>), ClassifierError> {
    let view = tensors.tensor(name).map_err(|e| {
        ClassifierError::Configuration(format!("Missing tensor '{}': {}", name, e))
    })?;
    if view.dtype() != Dtype::F32 {
        return Err(ClassifierError::Configuration(format!(
            "Tensor '{}' has dtype {:?}, expected F32",
            name,
            view.dtype()
        )));
    }
    let values = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((view.shape().to_vec(), values))
}

fn read_linear(tensors: &SafeTensors<'_>, layer: &str) -> Result<LinearParams, ClassifierError> {
    let weight_name = format!("{}.weight", layer);
    let bias_name = format!("{}.bias", layer);

    let (shape, values) = read_f32(tensors, &weight_name)?;
    let weight = match shape.as_slice() {
        &[rows, cols] => Array2::from_shape_vec((rows, cols), values).map_err(|e| {
            ClassifierError::Configuration(format!("Tensor '{}' is malformed: {}", weight_name, e))
        })?,
        other => {
            return Err(ClassifierError::Configuration(format!(
                "Tensor '{}' must be 2-dimensional, got shape {:?}",
                weight_name, other
            )))
        }
    };

    let (shape, values) = read_f32(tensors, &bias_name)?;
    if shape.len() != 1 {
        return Err(ClassifierError::Configuration(format!(
            "Tensor '{}' must be 1-dimensional, got shape {:?}",
            bias_name, shape
        )));
    }

    Ok(LinearParams::new(weight, Array1::from_vec(values)))
}
