//! Landmark emotion classifier.
//!
//! Architecture:
//!
//! ```text
//! [batch, 1404] → input_proj Linear(1404 → 128) → [batch, 1, 128]
//!   → transformer.layers.0 (8-head self-attention, FFN 512, post-norm)
//!   → [batch, 128] → dropout → fc Linear(128 → 6) → logits
//! ```
//!
//! The encoder runs over a single token, so attention reduces to a projection
//! of the value vector; the layer is kept for checkpoint compatibility.

use anyhow::{Context, Result};
use candle_core::{DType, Device, Module, ModuleT, Tensor};
use candle_nn::{linear, Dropout, Linear, VarBuilder, VarMap};

use super::encoder::EncoderLayer;
use crate::domain::{FEATURE_DIM, NUM_EMOTIONS};

/// Hyperparameters that fix the shape of the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
    /// Input features per sample.
    pub input_dim: usize,
    /// Width of the token embedding.
    pub hidden_dim: usize,
    /// Number of stacked encoder layers.
    pub num_layers: usize,
    /// Attention heads per layer.
    pub num_heads: usize,
    /// Dropout probability for every dropout site.
    pub dropout: f32,
    /// Output classes.
    pub num_classes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_dim: FEATURE_DIM,
            hidden_dim: 128,
            num_layers: 1,
            num_heads: 8,
            dropout: 0.3,
            num_classes: NUM_EMOTIONS,
        }
    }
}

impl ModelConfig {
    /// Width of the feed-forward sub-layer.
    #[must_use]
    pub const fn feedforward_dim(&self) -> usize {
        self.hidden_dim * 4
    }
}

/// Emotion classifier producing per-class logits.
pub struct EmotionClassifier {
    input_proj: Linear,
    layers: Vec<EncoderLayer>,
    dropout: Dropout,
    fc: Linear,
    config: ModelConfig,
    device: Device,
}

impl EmotionClassifier {
    /// Builds the model from a var builder (fresh `VarMap` or loaded weights).
    ///
    /// # Errors
    ///
    /// Returns an error if weights are missing or have unexpected shapes.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: ModelConfig, vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();

        let input_proj = linear(config.input_dim, config.hidden_dim, vb.pp("input_proj"))
            .context("Failed to build input projection")?;

        let layers_vb = vb.pp("transformer").pp("layers");
        let layers = (0..config.num_layers)
            .map(|i| {
                EncoderLayer::new(
                    config.hidden_dim,
                    config.num_heads,
                    config.feedforward_dim(),
                    config.dropout,
                    &layers_vb.pp(i.to_string()),
                )
                .with_context(|| format!("Failed to build encoder layer {i}"))
            })
            .collect::<Result<Vec<_>>>()?;

        let fc = linear(config.hidden_dim, config.num_classes, vb.pp("fc"))
            .context("Failed to build output layer")?;

        Ok(Self {
            input_proj,
            layers,
            dropout: Dropout::new(config.dropout),
            fc,
            config,
            device,
        })
    }

    /// Creates a freshly initialized, trainable model whose parameters live in `varmap`.
    ///
    /// # Errors
    ///
    /// Returns an error if parameter allocation fails.
    pub fn new_trainable(config: ModelConfig, varmap: &VarMap, device: &Device) -> Result<Self> {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
        Self::new(config, vb)
    }

    /// Computes logits in inference mode (dropout disabled).
    ///
    /// # Errors
    ///
    /// Returns an error on a shape mismatch or tensor failure.
    pub fn logits(&self, x: &Tensor) -> Result<Tensor> {
        Ok(self.forward_t(x, false)?)
    }

    /// Model hyperparameters.
    #[must_use]
    pub const fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Device the weights live on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }
}

impl ModuleT for EmotionClassifier {
    fn forward_t(&self, x: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        // [batch, input] -> [batch, 1, hidden]
        let mut h = self.input_proj.forward(x)?.unsqueeze(1)?;
        for layer in &self.layers {
            h = layer.forward_t(&h, train)?;
        }
        let h = h.squeeze(1)?;
        let h = self.dropout.forward(&h, train)?;
        self.fc.forward(&h)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_config() -> ModelConfig {
        ModelConfig {
            input_dim: 12,
            hidden_dim: 16,
            num_layers: 1,
            num_heads: 4,
            dropout: 0.3,
            num_classes: 6,
        }
    }

    #[test]
    fn test_default_config_matches_architecture() {
        let config = ModelConfig::default();
        assert_eq!(config.input_dim, 1404);
        assert_eq!(config.hidden_dim, 128);
        assert_eq!(config.num_heads, 8);
        assert_eq!(config.feedforward_dim(), 512);
        assert_eq!(config.num_classes, 6);
    }

    #[test]
    fn test_logits_shape() {
        let varmap = VarMap::new();
        let model = EmotionClassifier::new_trainable(small_config(), &varmap, &Device::Cpu).unwrap();
        let x = Tensor::randn(0.0_f32, 1.0, (5, 12), &Device::Cpu).unwrap();
        let logits = model.logits(&x).unwrap();
        assert_eq!(logits.dims(), &[5, 6]);
    }

    #[test]
    fn test_inference_mode_is_deterministic() {
        let varmap = VarMap::new();
        let model = EmotionClassifier::new_trainable(small_config(), &varmap, &Device::Cpu).unwrap();
        let x = Tensor::randn(0.0_f32, 1.0, (3, 12), &Device::Cpu).unwrap();
        let a: Vec<Vec<f32>> = model.logits(&x).unwrap().to_vec2().unwrap();
        let b: Vec<Vec<f32>> = model.logits(&x).unwrap().to_vec2().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_checkpoint_tensor_names() {
        let varmap = VarMap::new();
        let _model =
            EmotionClassifier::new_trainable(ModelConfig::default(), &varmap, &Device::Cpu).unwrap();
        let data = varmap.data().lock().unwrap();
        assert!(data.contains_key("input_proj.weight"));
        assert!(data.contains_key("transformer.layers.0.self_attn.in_proj_weight"));
        assert!(data.contains_key("transformer.layers.0.linear1.weight"));
        assert!(data.contains_key("fc.bias"));
        let fc = data.get("fc.weight").unwrap();
        assert_eq!(fc.dims(), &[6, 128]);
    }

    #[test]
    fn test_loads_from_saved_tensors() {
        let varmap = VarMap::new();
        let trained = EmotionClassifier::new_trainable(small_config(), &varmap, &Device::Cpu).unwrap();
        let tensors: std::collections::HashMap<String, Tensor> = varmap
            .data()
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.as_tensor().copy().unwrap()))
            .collect();

        let vb = VarBuilder::from_tensors(tensors, DType::F32, &Device::Cpu);
        let loaded = EmotionClassifier::new(small_config(), vb).unwrap();

        let x = Tensor::randn(0.0_f32, 1.0, (2, 12), &Device::Cpu).unwrap();
        let a: Vec<Vec<f32>> = trained.logits(&x).unwrap().to_vec2().unwrap();
        let b: Vec<Vec<f32>> = loaded.logits(&x).unwrap().to_vec2().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_rejects_wrong_class_count() {
        let varmap = VarMap::new();
        let _ = EmotionClassifier::new_trainable(small_config(), &varmap, &Device::Cpu).unwrap();
        let tensors: std::collections::HashMap<String, Tensor> = varmap
            .data()
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.as_tensor().clone()))
            .collect();

        let vb = VarBuilder::from_tensors(tensors, DType::F32, &Device::Cpu);
        let config = ModelConfig {
            num_classes: 7,
            ..small_config()
        };
        assert!(EmotionClassifier::new(config, vb).is_err());
    }
}
