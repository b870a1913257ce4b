//! Request-path inference over persisted artifacts.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use candle_core::{Device, Tensor};
use tracing::{debug, error, info, warn};

use super::classifier::{EmotionClassifier, ModelConfig};
use super::loader::var_builder_from_tensors;
use super::utils::{argmax, softmax};
use crate::domain::{
    FeatureVector, LabelSpace, NormalizationStats, PredictError, Prediction, FEATURE_DIM,
};
use crate::normalize::FeatureNormalizer;
use crate::ports::ArtifactStore;

/// Everything needed to answer a prediction, loaded once and never mutated.
pub struct ModelContext {
    classifier: EmotionClassifier,
    stats: NormalizationStats,
    labels: LabelSpace,
}

impl ModelContext {
    /// Binds a classifier to the stats and labels it was trained with.
    ///
    /// # Errors
    ///
    /// Fails if the model input width, the stats width and the landmark
    /// width disagree, or if the class count differs from the label count.
    pub fn new(
        classifier: EmotionClassifier,
        stats: NormalizationStats,
        labels: LabelSpace,
    ) -> Result<Self> {
        let config = classifier.config();
        if config.input_dim != FEATURE_DIM {
            bail!(
                "model expects {} inputs, landmark vectors have {FEATURE_DIM}",
                config.input_dim
            );
        }
        if stats.len() != config.input_dim {
            bail!(
                "normalization stats have {} features, model expects {}",
                stats.len(),
                config.input_dim
            );
        }
        if config.num_classes != labels.len() {
            bail!(
                "model has {} outputs but {} labels are stored",
                config.num_classes,
                labels.len()
            );
        }
        Ok(Self {
            classifier,
            stats,
            labels,
        })
    }

    /// Loads weights, stats and labels from `store` and builds the model.
    ///
    /// # Errors
    ///
    /// Fails if any artifact is missing or corrupt, if the store reports the
    /// artifacts do not belong together, or if shapes disagree.
    pub fn from_store(
        store: &dyn ArtifactStore,
        config: ModelConfig,
        device: &Device,
    ) -> Result<Self> {
        store
            .verify()
            .context("Stored artifacts do not belong to the same training run")?;

        let weights = store
            .load_weights(device)
            .context("Failed to load model weights")?;
        let stats = store
            .load_stats()
            .context("Failed to load normalization stats")?;
        let labels = store.load_labels().context("Failed to load label order")?;

        let vb = var_builder_from_tensors(weights, device);
        let classifier =
            EmotionClassifier::new(config, vb).context("Weights do not match the model layout")?;

        Self::new(classifier, stats, labels)
    }

    /// Label order used by this model.
    #[must_use]
    pub const fn labels(&self) -> &LabelSpace {
        &self.labels
    }

    /// Normalization stats paired with the weights.
    #[must_use]
    pub const fn stats(&self) -> &NormalizationStats {
        &self.stats
    }

    fn run(&self, features: &FeatureVector) -> Result<Vec<f32>> {
        let normalized = FeatureNormalizer::apply(features.as_slice(), &self.stats);
        let input = Tensor::from_vec(normalized, (1, FEATURE_DIM), self.classifier.device())
            .context("Failed to build input tensor")?;
        let logits = self.classifier.logits(&input)?;
        let logits: Vec<f32> = logits
            .squeeze(0)
            .and_then(|t| t.to_vec1())
            .context("Failed to read logits")?;
        if logits.iter().any(|v| !v.is_finite()) {
            bail!("model produced non-finite logits");
        }
        Ok(softmax(&logits))
    }
}

/// Prediction service shared by all requests.
///
/// Holds either a loaded [`ModelContext`] or the reason loading failed, so a
/// missing model never takes the process down.
pub struct InferenceService {
    context: std::result::Result<ModelContext, String>,
}

impl InferenceService {
    /// Loads the default architecture from `store`.
    ///
    /// Never fails; check [`InferenceService::is_available`].
    #[must_use]
    pub fn load(store: &dyn ArtifactStore, device: &Device) -> Self {
        Self::load_with_config(store, ModelConfig::default(), device)
    }

    /// Loads a model of the given architecture from `store`.
    #[must_use]
    pub fn load_with_config(store: &dyn ArtifactStore, config: ModelConfig, device: &Device) -> Self {
        info!("Loading emotion model from {}", store.describe());
        match ModelContext::from_store(store, config, device) {
            Ok(context) => {
                info!("Emotion model ready (labels: {})", context.labels());
                Self::new(context)
            }
            Err(e) => {
                warn!("Emotion model unavailable: {e:#}");
                Self::unavailable(format!("{e:#}"))
            }
        }
    }

    /// Wraps an already built context.
    #[must_use]
    pub const fn new(context: ModelContext) -> Self {
        Self {
            context: Ok(context),
        }
    }

    /// A service that rejects every valid request as unavailable.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            context: Err(reason.into()),
        }
    }

    /// True when artifacts are loaded.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.context.is_ok()
    }

    /// Why the model could not be loaded, if it could not.
    #[must_use]
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.context.as_ref().err().map(String::as_str)
    }

    /// Label order of the loaded model.
    #[must_use]
    pub fn labels(&self) -> Option<&LabelSpace> {
        self.context.as_ref().ok().map(ModelContext::labels)
    }

    /// Classifies one landmark vector.
    ///
    /// Input is validated before anything else, so a malformed request is
    /// reported as such even when no model is loaded.
    ///
    /// # Errors
    ///
    /// - [`PredictError::InvalidInput`] for a wrong length or non-finite value
    /// - [`PredictError::Unavailable`] when artifacts were not loaded
    /// - [`PredictError::Internal`] when the model itself fails
    pub fn predict(&self, landmarks: &[f32]) -> std::result::Result<Prediction, PredictError> {
        let features = FeatureVector::new(landmarks.to_vec())?;

        let context = self
            .context
            .as_ref()
            .map_err(|reason| PredictError::Unavailable(reason.clone()))?;

        let probabilities = context.run(&features).map_err(|e| {
            error!("Prediction failed: {e:#}");
            PredictError::Internal(e.to_string())
        })?;

        let index = argmax(&probabilities)
            .ok_or_else(|| PredictError::Internal("empty model output".to_string()))?;
        let emotion = context
            .labels
            .label(index)
            .ok_or_else(|| PredictError::Internal(format!("class {index} has no label")))?
            .to_string();

        let probabilities: BTreeMap<String, f32> = context
            .labels
            .iter()
            .map(|(_, label)| label.to_string())
            .zip(probabilities)
            .collect();

        debug!("Predicted {emotion}");
        Ok(Prediction {
            emotion,
            probabilities,
        })
    }
}
