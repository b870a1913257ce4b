//! Emotion Adapters - External adapters for emotion.
//!
//! This crate provides adapters for:
//! - CSV landmark datasets
//! - Filesystem artifact storage with a binding manifest

pub mod artifacts;
pub mod dataset;

pub use artifacts::{artifacts_dir, list_artifacts, ArtifactStatus, FsArtifactStore, Manifest};
pub use dataset::CsvDatasetSource;
