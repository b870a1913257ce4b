//! Artifact store port for persisted model state.

use std::collections::HashMap;

use candle_core::{Device, Tensor};

use crate::domain::{LabelSpace, NormalizationStats};

/// Summary of a finished training run, recorded when the artifact set is sealed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Validation accuracy of the retained checkpoint (0.0 to 1.0).
    pub best_accuracy: f64,
    /// Epoch that produced the retained checkpoint.
    pub best_epoch: usize,
    /// Epochs that ran.
    pub epochs: usize,
}

/// Port for saving and loading the four training artifacts: weights, mean,
/// std and label order.
///
/// Each artifact is independently loadable. Implementations overwrite on
/// save; only the latest version of each artifact exists.
pub trait ArtifactStore: Send + Sync {
    /// Persists model weights, replacing any previous checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn save_weights(&self, tensors: &HashMap<String, Tensor>) -> anyhow::Result<()>;

    /// Persists normalization statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn save_stats(&self, stats: &NormalizationStats) -> anyhow::Result<()>;

    /// Persists the label order.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn save_labels(&self, labels: &LabelSpace) -> anyhow::Result<()>;

    /// Binds the saved artifacts together once a run completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding record cannot be written.
    fn seal(&self, _summary: &RunSummary) -> anyhow::Result<()> {
        Ok(())
    }

    /// Loads model weights onto `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if the weights are missing or unreadable.
    fn load_weights(&self, device: &Device) -> anyhow::Result<HashMap<String, Tensor>>;

    /// Loads normalization statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the stats are missing or unreadable.
    fn load_stats(&self) -> anyhow::Result<NormalizationStats>;

    /// Loads the label order.
    ///
    /// # Errors
    ///
    /// Returns an error if the labels are missing or unreadable.
    fn load_labels(&self) -> anyhow::Result<LabelSpace>;

    /// Checks that the stored artifacts belong to the same run.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifacts are known not to match.
    fn verify(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Human-readable location, used in logs.
    fn describe(&self) -> String;
}
