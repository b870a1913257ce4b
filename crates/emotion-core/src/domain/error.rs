//! Error taxonomy for the request and training paths.

use std::fmt::Write as _;

/// Errors returned by [`crate::InferenceService::predict`].
///
/// Every variant is request-scoped; none is fatal to the service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PredictError {
    /// The landmark vector has the wrong shape or contains non-finite values.
    #[error("{}", invalid_input_message(*expected, *got, reason.as_deref()))]
    InvalidInput {
        /// Required vector length.
        expected: usize,
        /// Length received.
        got: usize,
        /// Additional detail, e.g. which value was not finite.
        reason: Option<String>,
    },
    /// Persisted artifacts were not loaded at startup.
    #[error("model unavailable: {0}")]
    Unavailable(String),
    /// Unexpected failure while running the model.
    #[error("prediction failed: {0}")]
    Internal(String),
}

fn invalid_input_message(expected: usize, got: usize, reason: Option<&str>) -> String {
    let mut message = format!("Invalid landmarks: expected {expected}, got {got}");
    if let Some(reason) = reason {
        let _ = write!(message, " ({reason})");
    }
    message
}

/// Fatal errors of a training run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrainingError {
    /// The labeled table cannot be trained on.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),
    /// A mini-batch produced a NaN or infinite loss.
    #[error("non-finite loss ({loss}) at epoch {epoch}, batch {batch}; training stopped")]
    NonFiniteLoss {
        /// 1-based epoch number.
        epoch: usize,
        /// 1-based batch number within the epoch.
        batch: usize,
        /// The offending loss value.
        loss: f32,
    },
    /// Validation accuracy never rose above zero, so no weights were kept.
    #[error("no checkpoint was saved: validation accuracy never exceeded 0 in {epochs} epochs")]
    NoCheckpoint {
        /// Epochs that ran.
        epochs: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message_names_lengths() {
        let err = PredictError::InvalidInput {
            expected: 1404,
            got: 1403,
            reason: None,
        };
        assert_eq!(err.to_string(), "Invalid landmarks: expected 1404, got 1403");
    }

    #[test]
    fn test_invalid_input_message_with_reason() {
        let err = PredictError::InvalidInput {
            expected: 1404,
            got: 1404,
            reason: Some("value at index 3 is not finite".to_string()),
        };
        assert!(err.to_string().ends_with("(value at index 3 is not finite)"));
    }

    #[test]
    fn test_non_finite_loss_names_epoch() {
        let err = TrainingError::NonFiniteLoss {
            epoch: 7,
            batch: 2,
            loss: f32::NAN,
        };
        assert!(err.to_string().contains("epoch 7"));
    }
}
