//! Emotion Core - Domain logic, classifier, training and inference
//!
//! This crate contains the landmark domain types, the feature normalizer, the
//! transformer classifier with its training loop, and the inference service
//! used by the HTTP endpoint.

pub mod domain;
pub mod inference;
pub mod normalize;
pub mod ports;
pub mod training;

pub use domain::{
    FeatureVector, LabelSpace, NormalizationStats, PredictError, Prediction, RawTable,
    TrainingError, FEATURE_DIM, NUM_EMOTIONS,
};
pub use inference::{EmotionClassifier, InferenceService, ModelConfig};
pub use normalize::FeatureNormalizer;
pub use ports::{ArtifactStore, DatasetSource, TrainingEvent, TrainingObserver};
pub use training::{TrainConfig, Trainer, TrainingReport};
