//! Mock implementations of core port traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{anyhow, bail};
use candle_core::{Device, Tensor};
use emotion_core::domain::{LabelSpace, NormalizationStats, RawTable};
use emotion_core::ports::{
    ArtifactStore, DatasetSource, RunSummary, TrainingEvent, TrainingObserver,
};

/// Mock implementation of `DatasetSource` for testing.
///
/// Returns a clone of a pre-built table, or a fixed error.
pub struct MockDatasetSource {
    table: Result<RawTable, String>,
    load_count: Arc<Mutex<usize>>,
}

impl MockDatasetSource {
    /// Creates a source that yields `table`.
    #[must_use]
    pub fn new(table: RawTable) -> Self {
        Self {
            table: Ok(table),
            load_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates a source whose `load` always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            table: Err(message.into()),
            load_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns the number of times the source has been loaded.
    #[must_use]
    pub fn load_count(&self) -> usize {
        *self
            .load_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DatasetSource for MockDatasetSource {
    fn load(&self) -> anyhow::Result<RawTable> {
        *self
            .load_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        self.table.clone().map_err(|e| anyhow!(e))
    }

    fn describe(&self) -> String {
        "mock://dataset".to_string()
    }
}

#[derive(Default)]
struct StoredArtifacts {
    weights: Option<HashMap<String, Tensor>>,
    stats: Option<NormalizationStats>,
    labels: Option<LabelSpace>,
    summary: Option<RunSummary>,
    weight_saves: usize,
}

/// In-memory `ArtifactStore` for testing.
///
/// Records every save so tests can assert what a run persisted.
#[derive(Default)]
pub struct MockArtifactStore {
    inner: Mutex<StoredArtifacts>,
    fail_weight_saves: bool,
    verify_error: Option<String>,
}

impl MockArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with a complete artifact set.
    #[must_use]
    pub fn with_artifacts(
        weights: HashMap<String, Tensor>,
        stats: NormalizationStats,
        labels: LabelSpace,
    ) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            inner.weights = Some(weights);
            inner.stats = Some(stats);
            inner.labels = Some(labels);
        }
        store
    }

    /// Makes every `save_weights` call fail.
    #[must_use]
    pub const fn failing_weight_saves(mut self) -> Self {
        self.fail_weight_saves = true;
        self
    }

    /// Makes `verify` report a mismatched artifact set.
    #[must_use]
    pub fn with_verify_error(mut self, message: impl Into<String>) -> Self {
        self.verify_error = Some(message.into());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoredArtifacts> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of successful `save_weights` calls.
    #[must_use]
    pub fn weight_saves(&self) -> usize {
        self.lock().weight_saves
    }

    /// The most recently saved weights.
    #[must_use]
    pub fn weights(&self) -> Option<HashMap<String, Tensor>> {
        self.lock().weights.clone()
    }

    /// The saved stats.
    #[must_use]
    pub fn stats(&self) -> Option<NormalizationStats> {
        self.lock().stats.clone()
    }

    /// The saved labels.
    #[must_use]
    pub fn labels(&self) -> Option<LabelSpace> {
        self.lock().labels.clone()
    }

    /// The summary passed to `seal`, if the run completed.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummary> {
        self.lock().summary.clone()
    }
}

impl ArtifactStore for MockArtifactStore {
    fn save_weights(&self, tensors: &HashMap<String, Tensor>) -> anyhow::Result<()> {
        if self.fail_weight_saves {
            bail!("mock weight save failure");
        }
        let mut inner = self.lock();
        inner.weights = Some(tensors.clone());
        inner.weight_saves += 1;
        Ok(())
    }

    fn save_stats(&self, stats: &NormalizationStats) -> anyhow::Result<()> {
        self.lock().stats = Some(stats.clone());
        Ok(())
    }

    fn save_labels(&self, labels: &LabelSpace) -> anyhow::Result<()> {
        self.lock().labels = Some(labels.clone());
        Ok(())
    }

    fn seal(&self, summary: &RunSummary) -> anyhow::Result<()> {
        self.lock().summary = Some(summary.clone());
        Ok(())
    }

    fn load_weights(&self, device: &Device) -> anyhow::Result<HashMap<String, Tensor>> {
        let weights = self
            .lock()
            .weights
            .clone()
            .ok_or_else(|| anyhow!("no weights saved"))?;
        weights
            .into_iter()
            .map(|(name, t)| Ok((name, t.to_device(device)?)))
            .collect()
    }

    fn load_stats(&self) -> anyhow::Result<NormalizationStats> {
        self.lock()
            .stats
            .clone()
            .ok_or_else(|| anyhow!("no stats saved"))
    }

    fn load_labels(&self) -> anyhow::Result<LabelSpace> {
        self.lock()
            .labels
            .clone()
            .ok_or_else(|| anyhow!("no labels saved"))
    }

    fn verify(&self) -> anyhow::Result<()> {
        match &self.verify_error {
            Some(message) => bail!("{message}"),
            None => Ok(()),
        }
    }

    fn describe(&self) -> String {
        "mock://artifacts".to_string()
    }
}

/// Mock implementation of `TrainingObserver` for testing.
///
/// Captures events for later assertions.
pub struct MockTrainingObserver {
    events: Arc<Mutex<Vec<TrainingEvent>>>,
}

impl MockTrainingObserver {
    /// Creates a new mock observer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<TrainingEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of completed epochs reported.
    #[must_use]
    pub fn completed_epochs(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, TrainingEvent::EpochCompleted { .. }))
            .count()
    }

    /// Returns `(epoch, accuracy)` for every reported checkpoint.
    #[must_use]
    pub fn checkpoints(&self) -> Vec<(usize, f64)> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                TrainingEvent::CheckpointSaved { epoch, accuracy } => Some((*epoch, *accuracy)),
                _ => None,
            })
            .collect()
    }

    /// Returns true if an `Aborted` event was reported.
    #[must_use]
    pub fn was_aborted(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, TrainingEvent::Aborted { .. }))
    }
}

impl Default for MockTrainingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingObserver for MockTrainingObserver {
    fn on_event(&self, event: TrainingEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
