//! Core domain types for landmark emotion classification.

mod error;
mod labels;
mod landmarks;
mod prediction;
mod stats;
mod table;

pub use error::{PredictError, TrainingError};
pub use labels::{LabelSpace, LabelSpaceError, NUM_EMOTIONS};
pub use landmarks::{FeatureVector, COORDS_PER_LANDMARK, FEATURE_DIM, LANDMARK_COUNT};
pub use prediction::Prediction;
pub use stats::{NormalizationStats, StatsError};
pub use table::{RawRow, RawTable};
