//! CLI command definitions and handlers.

pub mod artifacts;
pub mod predict;
pub mod serve;
pub mod train;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

/// Emotion - classify facial expressions from face-mesh landmarks
#[derive(Parser)]
#[command(name = "emotion")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Train the classifier on a landmark CSV
    Train(train::TrainArgs),
    /// Serve predictions over HTTP
    Serve(serve::ServeArgs),
    /// Classify one landmark vector from a JSON file or stdin
    Predict(predict::PredictArgs),
    /// Inspect persisted artifacts
    Artifacts(artifacts::ArtifactsArgs),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Command completed.
    Success = 0,
    /// Command failed.
    Error = 2,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        Self::from(code as u8)
    }
}

/// Artifacts directory: CLI flag, then config, then the XDG default.
pub fn resolve_artifacts_dir(flag: Option<&PathBuf>, config: &AppConfig) -> PathBuf {
    flag.cloned()
        .or_else(|| config.artifacts.dir.clone())
        .unwrap_or_else(emotion_adapters::artifacts_dir)
}
