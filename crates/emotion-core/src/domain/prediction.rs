//! Inference results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Predicted emotion with the full probability distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Label with the highest probability.
    pub emotion: String,
    /// Softmax probability for every label.
    pub probabilities: BTreeMap<String, f32>,
}

impl Prediction {
    /// Probability assigned to the predicted emotion.
    #[must_use]
    pub fn confidence(&self) -> f32 {
        self.probabilities
            .get(&self.emotion)
            .copied()
            .unwrap_or_default()
    }
}
