//! Training hyperparameters.

use anyhow::{bail, Result};

use crate::inference::ModelConfig;

/// Hyperparameters for one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    /// Passes over the training partition.
    pub epochs: usize,
    /// Rows per mini-batch.
    pub batch_size: usize,
    /// Adam step size.
    pub learning_rate: f64,
    /// L2 penalty added to every gradient.
    pub weight_decay: f64,
    /// Dropout probability at every dropout site.
    pub dropout: f32,
    /// Std of the Gaussian noise added to each training batch.
    pub noise_std: f32,
    /// Fraction of rows held out for validation.
    pub val_ratio: f64,
    /// Seed for the split, batch order and noise.
    pub seed: u64,
    /// Global gradient L2 norm ceiling.
    pub max_grad_norm: f64,
    /// Token embedding width.
    pub hidden_dim: usize,
    /// Encoder layers.
    pub num_layers: usize,
    /// Attention heads per layer.
    pub num_heads: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-4,
            weight_decay: 1e-4,
            dropout: model.dropout,
            noise_std: 0.01,
            val_ratio: 0.2,
            seed: 42,
            max_grad_norm: 1.0,
            hidden_dim: model.hidden_dim,
            num_layers: model.num_layers,
            num_heads: model.num_heads,
        }
    }
}

impl TrainConfig {
    /// Model shape for a table of `input_dim` feature columns.
    #[must_use]
    pub fn model_config(&self, input_dim: usize) -> ModelConfig {
        ModelConfig {
            input_dim,
            hidden_dim: self.hidden_dim,
            num_layers: self.num_layers,
            num_heads: self.num_heads,
            dropout: self.dropout,
            ..ModelConfig::default()
        }
    }

    /// Checks that the values can drive a run.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if !(self.weight_decay.is_finite() && self.weight_decay >= 0.0) {
            bail!("weight_decay must be non-negative, got {}", self.weight_decay);
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
            bail!("noise_std must be non-negative, got {}", self.noise_std);
        }
        if !(self.val_ratio > 0.0 && self.val_ratio < 1.0) {
            bail!("val_ratio must be in (0, 1), got {}", self.val_ratio);
        }
        if !(self.max_grad_norm.is_finite() && self.max_grad_norm > 0.0) {
            bail!("max_grad_norm must be positive, got {}", self.max_grad_norm);
        }
        if self.num_layers == 0 {
            bail!("num_layers must be at least 1");
        }
        if self.num_heads == 0 || self.hidden_dim % self.num_heads != 0 {
            bail!(
                "hidden_dim {} is not divisible by num_heads {}",
                self.hidden_dim,
                self.num_heads
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrainConfig::default();
        assert_eq!(config.epochs, 50);
        assert_eq!(config.batch_size, 32);
        assert!((config.learning_rate - 1e-4).abs() < 1e-12);
        assert!((config.val_ratio - 0.2).abs() < 1e-12);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_config_uses_table_width() {
        let config = TrainConfig {
            hidden_dim: 32,
            ..TrainConfig::default()
        };
        let model = config.model_config(20);
        assert_eq!(model.input_dim, 20);
        assert_eq!(model.hidden_dim, 32);
        assert_eq!(model.num_classes, 6);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig {
                epochs: 0,
                ..TrainConfig::default()
            },
            TrainConfig {
                val_ratio: 1.0,
                ..TrainConfig::default()
            },
            TrainConfig {
                dropout: 1.0,
                ..TrainConfig::default()
            },
            TrainConfig {
                num_heads: 3,
                ..TrainConfig::default()
            },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
