//! Evaluation metrics.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]

use candle_core::{ModuleT, D};

use super::data::Partition;
use crate::inference::EmotionClassifier;

/// Fraction of predictions equal to their label; 0.0 when there are none.
#[must_use]
pub fn accuracy(predictions: &[u32], labels: &[u32]) -> f64 {
    let total = predictions.len().min(labels.len());
    if total == 0 {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(p, l)| p == l)
        .count();
    correct as f64 / total as f64
}

/// Evaluates `model` on `partition` in inference mode.
///
/// # Errors
///
/// Returns an error if the forward pass fails.
pub fn evaluate(model: &EmotionClassifier, partition: &Partition) -> candle_core::Result<f64> {
    if partition.is_empty() {
        return Ok(0.0);
    }
    let (inputs, _) = partition.to_tensors(model.device())?;
    let predictions: Vec<u32> = model
        .forward_t(&inputs, false)?
        .argmax(D::Minus1)?
        .to_vec1()?;
    Ok(accuracy(&predictions, partition.labels()))
}

/// Running mean of per-batch losses.
#[derive(Debug, Default, Clone, Copy)]
pub struct LossAverage {
    sum: f64,
    count: usize,
}

impl LossAverage {
    /// Adds one batch loss.
    pub fn push(&mut self, loss: f64) {
        self.sum += loss;
        self.count += 1;
    }

    /// Mean so far, 0.0 before any batch.
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}
