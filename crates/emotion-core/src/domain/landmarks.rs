//! Landmark feature vectors.

use super::PredictError;

/// Number of tracked facial landmarks.
pub const LANDMARK_COUNT: usize = 468;

/// Spatial coordinates per landmark (x, y, z).
pub const COORDS_PER_LANDMARK: usize = 3;

/// Length of a flattened landmark feature vector.
pub const FEATURE_DIM: usize = LANDMARK_COUNT * COORDS_PER_LANDMARK;

/// A validated landmark vector of exactly [`FEATURE_DIM`] finite scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Validates and wraps a raw landmark vector.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::InvalidInput`] when the length is not
    /// [`FEATURE_DIM`] or any value is NaN or infinite.
    pub fn new(values: Vec<f32>) -> Result<Self, PredictError> {
        Self::validate(&values)?;
        Ok(Self(values))
    }

    /// Checks a landmark slice without taking ownership.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FeatureVector::new`].
    pub fn validate(values: &[f32]) -> Result<(), PredictError> {
        if values.len() != FEATURE_DIM {
            return Err(PredictError::InvalidInput {
                expected: FEATURE_DIM,
                got: values.len(),
                reason: None,
            });
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictError::InvalidInput {
                expected: FEATURE_DIM,
                got: values.len(),
                reason: Some(format!("value at index {index} is not finite")),
            });
        }
        Ok(())
    }

    /// Returns the underlying scalars.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Consumes the vector and returns its scalars.
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
