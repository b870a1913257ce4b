//! Progress bar adapter using indicatif.

use emotion_core::{TrainingEvent, TrainingObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Epoch progress bar for `emotion train`.
pub struct TrainingProgress {
    bar: ProgressBar,
}

impl TrainingProgress {
    /// Creates a hidden bar; its length is set when training starts.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} epochs {msg}",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }

        Self { bar }
    }
}

impl Default for TrainingProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingObserver for TrainingProgress {
    fn on_event(&self, event: TrainingEvent) {
        match event {
            TrainingEvent::Started {
                train_rows,
                val_rows,
                epochs,
            } => {
                self.bar.set_length(epochs as u64);
                self.bar
                    .println(format!("Training on {train_rows} rows, validating on {val_rows}"));
            }
            TrainingEvent::EpochStarted { .. } => {}
            TrainingEvent::EpochCompleted { metrics } => {
                self.bar.set_message(format!(
                    "loss {:.4} acc {:.4}",
                    metrics.train_loss, metrics.val_accuracy
                ));
                self.bar.inc(1);
            }
            TrainingEvent::CheckpointSaved { epoch, accuracy } => {
                self.bar
                    .println(format!("epoch {epoch}: saved checkpoint (val_acc {accuracy:.4})"));
            }
            TrainingEvent::Aborted { epoch, reason } => {
                self.bar
                    .abandon_with_message(format!("aborted at epoch {epoch}: {reason}"));
            }
            TrainingEvent::Finished { best_accuracy, .. } => {
                self.bar
                    .finish_with_message(format!("best val_acc {best_accuracy:.4}"));
            }
        }
    }
}
