//! Safetensors decoding for model weights and numeric artifacts.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Decodes a safetensors buffer into named tensors on `device`.
///
/// # Errors
///
/// Returns an error if the buffer is not valid safetensors or holds an
/// unsupported dtype.
pub fn tensors_from_safetensors(data: &[u8], device: &Device) -> Result<HashMap<String, Tensor>> {
    let tensors = SafeTensors::deserialize(data).context("Failed to parse safetensors")?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();

    for name in tensors.names() {
        let tensor_view = tensors
            .tensor(name)
            .with_context(|| format!("Failed to get tensor '{name}'"))?;

        let dtype = safetensors_dtype_to_candle(tensor_view.dtype())?;
        let shape: Vec<usize> = tensor_view.shape().to_vec();

        let tensor = Tensor::from_raw_buffer(tensor_view.data(), dtype, &shape, device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;

        tensor_map.insert(name.clone(), tensor);
    }

    debug!("Decoded {} tensors", tensor_map.len());
    Ok(tensor_map)
}

/// Reads a safetensors file and creates a `VarBuilder` over its tensors.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The safetensors data is invalid
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;

    let tensors = tensors_from_safetensors(&data, device)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    Ok(var_builder_from_tensors(tensors, device))
}

/// Wraps loaded tensors in an immutable `VarBuilder`.
#[must_use]
pub fn var_builder_from_tensors(
    tensors: HashMap<String, Tensor>,
    device: &Device,
) -> VarBuilder<'static> {
    VarBuilder::from_tensors(tensors, DType::F32, device)
}

/// Extracts a named 1-D tensor as `f32` values.
///
/// # Errors
///
/// Returns an error if the tensor is absent or not one-dimensional.
pub fn vector_from_tensors(tensors: &HashMap<String, Tensor>, name: &str) -> Result<Vec<f32>> {
    let tensor = tensors
        .get(name)
        .with_context(|| format!("Tensor '{name}' not found"))?;
    tensor
        .to_dtype(DType::F32)
        .and_then(|t| t.to_vec1::<f32>())
        .with_context(|| format!("Tensor '{name}' is not a 1-D float vector"))
}

/// Converts safetensors dtype to candle dtype.
fn safetensors_dtype_to_candle(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => anyhow::bail!("Unsupported dtype: {other:?}"),
    }
}
