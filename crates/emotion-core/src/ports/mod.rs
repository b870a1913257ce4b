//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod artifact_store;
mod dataset_source;
mod progress;

pub use artifact_store::{ArtifactStore, RunSummary};
pub use dataset_source::DatasetSource;
pub use progress::{EpochMetrics, NullObserver, TrainingEvent, TrainingObserver};
