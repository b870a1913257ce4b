//! Test support utilities for emotion.
//!
//! Provides mocks, synthetic landmark datasets, and throwaway model
//! artifacts for testing training and inference.
//!
//! # Example
//!
//! ```
//! use emotion_test_support::{MockDatasetSource, SyntheticDatasetBuilder};
//!
//! // Six well-separated classes over 12 features
//! let table = SyntheticDatasetBuilder::new().width(12).rows_per_label(5).build();
//! assert_eq!(table.len(), 30);
//!
//! let source = MockDatasetSource::new(table);
//! ```

mod builders;
mod mocks;

pub use builders::{
    random_artifacts, small_model_config, synthetic_labels, SyntheticDatasetBuilder,
    SYNTHETIC_LABELS,
};
pub use mocks::{MockArtifactStore, MockDatasetSource, MockTrainingObserver};
