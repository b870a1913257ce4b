//! Train command - fit the classifier and persist its artifacts.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use emotion_adapters::{CsvDatasetSource, FsArtifactStore};
use emotion_core::inference::get_device;
use emotion_core::ports::NullObserver;
use emotion_core::{TrainConfig, Trainer, TrainingObserver, TrainingReport};
use tracing::debug;

use super::resolve_artifacts_dir;
use crate::config::AppConfig;
use crate::output::TrainingProgress;

/// Arguments for the train command
#[derive(Args, Clone)]
pub struct TrainArgs {
    /// Landmark CSV (defaults to `dataset.path` from the config)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Directory to write artifacts to
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,

    /// Column holding the emotion label
    #[arg(long)]
    pub label_column: Option<String>,

    /// Number of epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Rows per mini-batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Adam learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Seed for the split, shuffling and noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Suppress the progress bar and summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl TrainArgs {
    /// Applies CLI overrides on top of the config file values.
    fn train_config(&self, config: &AppConfig) -> TrainConfig {
        let mut train = config.train_config();
        if let Some(epochs) = self.epochs {
            train.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            train.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            train.learning_rate = lr;
        }
        if let Some(seed) = self.seed {
            train.seed = seed;
        }
        train
    }
}

/// Run the train command.
pub fn run(args: &TrainArgs) -> Result<()> {
    let config = AppConfig::load();
    let train_config = args.train_config(&config);
    debug!("Training config: {train_config:?}");

    let Some(dataset) = args.dataset.clone().or_else(|| config.dataset.path.clone()) else {
        bail!("No dataset specified. Pass --dataset or set dataset.path in the config.");
    };

    let mut source = CsvDatasetSource::new(dataset);
    if let Some(column) = args
        .label_column
        .clone()
        .or_else(|| config.dataset.label_column.clone())
    {
        source = source.with_label_column(column);
    }
    if let Some(columns) = config.dataset.exclude_columns.clone() {
        source = source.with_exclude_columns(columns);
    }

    let store = FsArtifactStore::new(resolve_artifacts_dir(args.artifacts_dir.as_ref(), &config));

    let progress;
    let observer: &dyn TrainingObserver = if args.quiet {
        &NullObserver
    } else {
        progress = TrainingProgress::new();
        &progress
    };

    let trainer = Trainer::new(train_config, get_device());
    let report = trainer.run(&source, &store, observer)?;

    if !args.quiet {
        print_summary(&report, &store);
    }
    Ok(())
}

fn print_summary(report: &TrainingReport, store: &FsArtifactStore) {
    println!(
        "Trained on {} rows, validated on {} rows",
        report.train_rows, report.val_rows
    );
    println!(
        "Best validation accuracy: {:.4} (epoch {} of {})",
        report.best_accuracy,
        report.best_epoch,
        report.epochs.len()
    );
    println!("Labels: {}", report.labels.as_slice().join(", "));
    println!("Artifacts: {}", store.dir().display());
}
