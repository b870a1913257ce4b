//! Training progress port for UI integration.

/// Metrics for one completed epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean cross-entropy over the epoch's training batches.
    pub train_loss: f64,
    /// Correct validation predictions divided by validation rows.
    pub val_accuracy: f64,
    /// Whether this epoch produced a new checkpoint.
    pub checkpoint_saved: bool,
}

/// Events emitted during training.
#[derive(Debug, Clone)]
pub enum TrainingEvent {
    /// Data is prepared and the epoch loop is about to start.
    Started {
        /// Training rows.
        train_rows: usize,
        /// Validation rows.
        val_rows: usize,
        /// Planned epochs.
        epochs: usize,
    },
    /// An epoch began.
    EpochStarted {
        /// 1-based epoch number.
        epoch: usize,
        /// Planned epochs.
        total: usize,
    },
    /// An epoch finished and was evaluated.
    EpochCompleted {
        /// The epoch's metrics.
        metrics: EpochMetrics,
    },
    /// Validation accuracy improved and weights were persisted.
    CheckpointSaved {
        /// 1-based epoch number.
        epoch: usize,
        /// Accuracy that earned the checkpoint.
        accuracy: f64,
    },
    /// The run stopped early.
    Aborted {
        /// 1-based epoch number.
        epoch: usize,
        /// Why the run stopped.
        reason: String,
    },
    /// The epoch loop completed.
    Finished {
        /// Best validation accuracy reached.
        best_accuracy: f64,
        /// Epochs that ran.
        epochs: usize,
    },
}

/// Port for receiving training events.
pub trait TrainingObserver: Send + Sync {
    /// Called when a training event occurs.
    fn on_event(&self, event: TrainingEvent);
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TrainingObserver for NullObserver {
    fn on_event(&self, _event: TrainingEvent) {}
}
