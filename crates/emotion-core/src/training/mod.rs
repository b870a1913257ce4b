//! Offline training pipeline.
//!
//! Rows are cleaned and normalized, split into train/validation partitions,
//! and fed to the classifier in shuffled, noise-augmented mini-batches.
//! Weights are persisted whenever validation accuracy strictly improves.

mod checkpoint;
mod config;
mod data;
mod metrics;
mod optim;
mod trainer;

pub use checkpoint::{snapshot, CheckpointPolicy};
pub use config::TrainConfig;
pub use data::{split_indices, BatchIterator, GaussianNoise, Partition, PreparedDataset};
pub use metrics::{accuracy, evaluate, LossAverage};
pub use optim::{clip_grad_norm, Adam, ParamsAdam};
pub use trainer::{CheckpointEvent, Trainer, TrainingReport};
