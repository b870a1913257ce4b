//! Per-feature normalization statistics.

use super::FEATURE_DIM;

/// Column-wise mean and standard deviation of the training features.
///
/// `std` already includes the epsilon added at fit time. Stats are
/// immutable once built and must be paired with the weights trained
/// against them.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    mean: Vec<f32>,
    std: Vec<f32>,
}

/// Reasons a mean/std pair is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    /// Mean and std have different lengths.
    #[error("mean has {mean} values but std has {std}")]
    LengthMismatch {
        /// Length of the mean vector.
        mean: usize,
        /// Length of the std vector.
        std: usize,
    },
    /// Vectors do not match the landmark feature dimension.
    #[error("normalization stats have {0} features, expected {expected}", expected = FEATURE_DIM)]
    WrongDimension(usize),
    /// A value is NaN, infinite, or a std is not positive.
    #[error("invalid {which} value at index {index}")]
    InvalidValue {
        /// `"mean"` or `"std"`.
        which: &'static str,
        /// Offending position.
        index: usize,
    },
}

impl NormalizationStats {
    /// Creates stats of any width. Used for training tables and tests.
    ///
    /// # Errors
    ///
    /// Fails if the lengths differ, any value is non-finite, or any std is
    /// not strictly positive.
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, StatsError> {
        if mean.len() != std.len() {
            return Err(StatsError::LengthMismatch {
                mean: mean.len(),
                std: std.len(),
            });
        }
        if let Some(index) = mean.iter().position(|m| !m.is_finite()) {
            return Err(StatsError::InvalidValue {
                which: "mean",
                index,
            });
        }
        if let Some(index) = std.iter().position(|s| !s.is_finite() || *s <= 0.0) {
            return Err(StatsError::InvalidValue { which: "std", index });
        }
        Ok(Self { mean, std })
    }

    /// Creates stats and additionally requires the landmark width.
    ///
    /// # Errors
    ///
    /// Same as [`NormalizationStats::new`], plus [`StatsError::WrongDimension`].
    pub fn for_landmarks(mean: Vec<f32>, std: Vec<f32>) -> Result<Self, StatsError> {
        let stats = Self::new(mean, std)?;
        if stats.len() != FEATURE_DIM {
            return Err(StatsError::WrongDimension(stats.len()));
        }
        Ok(stats)
    }

    /// Identity stats (mean 0, std 1).
    #[must_use]
    pub fn identity(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            std: vec![1.0; len],
        }
    }

    /// Per-feature means.
    #[must_use]
    pub fn mean(&self) -> &[f32] {
        &self.mean
    }

    /// Per-feature standard deviations.
    #[must_use]
    pub fn std(&self) -> &[f32] {
        &self.std
    }

    /// Number of features covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// True when the stats cover no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}
