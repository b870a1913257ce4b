//! Inference service tests over stored artifacts.

#![allow(clippy::unwrap_used)]

use candle_core::Device;
use emotion_core::domain::{NormalizationStats, PredictError, FEATURE_DIM};
use emotion_core::inference::InferenceService;
use emotion_test_support::{random_artifacts, small_model_config, MockArtifactStore};

fn loaded_service() -> InferenceService {
    let (weights, stats, labels) = random_artifacts(small_model_config(), &Device::Cpu).unwrap();
    let store = MockArtifactStore::with_artifacts(weights, stats, labels);
    InferenceService::load_with_config(&store, small_model_config(), &Device::Cpu)
}

#[test]
fn test_loaded_service_reports_labels() {
    let service = loaded_service();
    assert!(service.is_available());
    assert_eq!(service.labels().unwrap().len(), 6);
}

#[test]
fn test_probabilities_cover_every_label() {
    let service = loaded_service();
    let prediction = service.predict(&vec![0.25; FEATURE_DIM]).unwrap();
    let labels = service.labels().unwrap();
    for (_, label) in labels.iter() {
        assert!(prediction.probabilities.contains_key(label));
    }
    let total: f32 = prediction.probabilities.values().sum();
    assert!((total - 1.0).abs() < 1e-5);
}

#[test]
fn test_empty_store_is_unavailable() {
    let service =
        InferenceService::load_with_config(&MockArtifactStore::new(), small_model_config(), &Device::Cpu);
    assert!(!service.is_available());
    assert!(service.unavailable_reason().unwrap().contains("weights"));
    assert!(matches!(
        service.predict(&vec![0.0; FEATURE_DIM]),
        Err(PredictError::Unavailable(_))
    ));
}

#[test]
fn test_mismatched_artifacts_are_unavailable() {
    let (weights, stats, labels) = random_artifacts(small_model_config(), &Device::Cpu).unwrap();
    let store = MockArtifactStore::with_artifacts(weights, stats, labels)
        .with_verify_error("std.safetensors digest mismatch");
    let service = InferenceService::load_with_config(&store, small_model_config(), &Device::Cpu);
    assert!(!service.is_available());
    assert!(service.unavailable_reason().unwrap().contains("digest mismatch"));
}

#[test]
fn test_stats_of_wrong_width_are_rejected() {
    let (weights, _, labels) = random_artifacts(small_model_config(), &Device::Cpu).unwrap();
    let store = MockArtifactStore::with_artifacts(weights, NormalizationStats::identity(10), labels);
    let service = InferenceService::load_with_config(&store, small_model_config(), &Device::Cpu);
    assert!(!service.is_available());
}

#[test]
fn test_architecture_mismatch_is_unavailable() {
    let (weights, stats, labels) = random_artifacts(small_model_config(), &Device::Cpu).unwrap();
    let store = MockArtifactStore::with_artifacts(weights, stats, labels);
    // Default hidden width (128) does not match the stored 16-wide weights.
    let service = InferenceService::load(&store, &Device::Cpu);
    assert!(!service.is_available());
}

#[test]
fn test_short_vector_rejected_before_model() {
    let err = loaded_service().predict(&vec![0.0; 1403]).unwrap_err();
    assert_eq!(err.to_string(), "Invalid landmarks: expected 1404, got 1403");
}

#[test]
fn test_repeated_predictions_match() {
    let service = loaded_service();
    let input: Vec<f32> = (0..FEATURE_DIM).map(|i| ((i * 37) % 101) as f32 / 50.0).collect();
    let first = service.predict(&input).unwrap();
    for _ in 0..3 {
        assert_eq!(service.predict(&input).unwrap(), first);
    }
}
