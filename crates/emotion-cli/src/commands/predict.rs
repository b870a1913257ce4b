//! Predict command - classify one landmark vector offline.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use emotion_adapters::FsArtifactStore;
use emotion_core::inference::get_device;
use emotion_core::{FeatureVector, InferenceService};
use serde::Deserialize;

use super::resolve_artifacts_dir;
use crate::config::AppConfig;
use crate::output::write_json;

/// Arguments for the predict command
#[derive(Args, Clone)]
pub struct PredictArgs {
    /// JSON file with `{"landmarks": [...]}` or a bare array; `-` reads stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Directory to load artifacts from
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkInput {
    Object { landmarks: Vec<f32> },
    Array(Vec<f32>),
}

impl LandmarkInput {
    fn into_landmarks(self) -> Vec<f32> {
        match self {
            Self::Object { landmarks } | Self::Array(landmarks) => landmarks,
        }
    }
}

fn parse_landmarks(text: &str) -> Result<Vec<f32>> {
    let input: LandmarkInput = serde_json::from_str(text).context(
        "Expected a JSON array of numbers or an object with a \"landmarks\" array",
    )?;
    Ok(input.into_landmarks())
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))
    }
}

/// Run the predict command.
pub fn run(args: &PredictArgs) -> Result<()> {
    let config = AppConfig::load();
    let landmarks = parse_landmarks(&read_input(&args.input)?)?;
    FeatureVector::validate(&landmarks)?;

    let store = FsArtifactStore::new(resolve_artifacts_dir(args.artifacts_dir.as_ref(), &config));
    let service = InferenceService::load_with_config(&store, config.model_config(), &get_device());
    if let Some(reason) = service.unavailable_reason() {
        bail!("Model unavailable ({}): {reason}", store.dir().display());
    }

    let prediction = service.predict(&landmarks)?;
    write_json(&mut std::io::stdout().lock(), &prediction, args.pretty)
}
