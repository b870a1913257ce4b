//! Artifacts command - inspect persisted model artifacts.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use emotion_adapters::{list_artifacts, FsArtifactStore};

use super::resolve_artifacts_dir;
use crate::config::AppConfig;

/// Arguments for the artifacts command
#[derive(Args)]
pub struct ArtifactsArgs {
    /// Directory to inspect
    #[arg(long, global = true)]
    pub artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: ArtifactsCommand,
}

/// Artifacts subcommands
#[derive(Subcommand)]
pub enum ArtifactsCommand {
    /// List artifact files and the training run they belong to
    List,
    /// Print artifacts directory path
    Path,
}

/// Run the artifacts command.
pub fn run(args: &ArtifactsArgs) -> Result<()> {
    let config = AppConfig::load();
    let dir = resolve_artifacts_dir(args.artifacts_dir.as_ref(), &config);
    match args.command {
        ArtifactsCommand::List => list(dir),
        ArtifactsCommand::Path => print_path(&dir),
    }
}

fn list(dir: PathBuf) -> Result<()> {
    println!("Artifacts directory: {}", dir.display());
    println!();

    for status in list_artifacts(&dir) {
        match status.size {
            Some(size) => println!("  ✓ {} ({})", status.name, format_size(size)),
            None => println!("  ✗ {} (missing)", status.name),
        }
    }

    let store = FsArtifactStore::new(dir);
    if let Some(manifest) = store.read_manifest()? {
        println!();
        println!("Run:      {}", manifest.run_id);
        println!("Created:  {}", manifest.created_at);
        println!(
            "Accuracy: {:.4} (epoch {} of {})",
            manifest.best_accuracy, manifest.best_epoch, manifest.epochs
        );
    }

    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
fn print_path(dir: &std::path::Path) -> Result<()> {
    println!("{}", dir.display());
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
