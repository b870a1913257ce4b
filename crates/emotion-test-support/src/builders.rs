//! Synthetic landmark datasets and model artifacts for testing.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;
use std::fmt::Write as _;

use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use emotion_core::domain::{LabelSpace, NormalizationStats, RawTable, FEATURE_DIM};
use emotion_core::inference::{EmotionClassifier, ModelConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Emotion names used by the synthetic datasets, already in sorted order.
pub const SYNTHETIC_LABELS: [&str; 6] = ["angry", "disgust", "fear", "happy", "sad", "surprise"];

/// Builder for labeled landmark tables with well-separated classes.
///
/// Every class shifts a disjoint stripe of features (`feature % 6 == class`)
/// by `separation`, on top of uniform jitter, so even a tiny model can
/// reach high validation accuracy within a few epochs.
#[derive(Debug, Clone)]
pub struct SyntheticDatasetBuilder {
    width: usize,
    rows_per_label: usize,
    separation: f32,
    jitter: f32,
    seed: u64,
    unlabeled_rows: usize,
}

impl Default for SyntheticDatasetBuilder {
    fn default() -> Self {
        Self {
            width: FEATURE_DIM,
            rows_per_label: 10,
            separation: 1.0,
            jitter: 0.1,
            seed: 7,
            unlabeled_rows: 0,
        }
    }
}

impl SyntheticDatasetBuilder {
    /// Full-width landmark rows, 10 per label.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of feature columns.
    #[must_use]
    pub const fn width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    /// Sets the number of rows for each of the six labels.
    #[must_use]
    pub const fn rows_per_label(mut self, rows: usize) -> Self {
        self.rows_per_label = rows;
        self
    }

    /// Sets the class offset.
    #[must_use]
    pub const fn separation(mut self, separation: f32) -> Self {
        self.separation = separation;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Appends rows with no label.
    #[must_use]
    pub const fn unlabeled_rows(mut self, rows: usize) -> Self {
        self.unlabeled_rows = rows;
        self
    }

    /// One landmark vector typical of `class`, without jitter.
    #[must_use]
    pub fn prototype(&self, class: usize) -> Vec<f32> {
        (0..self.width)
            .map(|j| {
                if j % SYNTHETIC_LABELS.len() == class {
                    self.separation
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Builds the table; rows are grouped by label.
    #[must_use]
    pub fn build(&self) -> RawTable {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let names = (0..self.width).map(|j| format!("f{j}")).collect();
        let mut table = RawTable::new(names);

        for (class, label) in SYNTHETIC_LABELS.iter().enumerate() {
            let prototype = self.prototype(class);
            for _ in 0..self.rows_per_label {
                let row = prototype
                    .iter()
                    .map(|v| v + rng.gen_range(-self.jitter..=self.jitter))
                    .collect();
                table.push(row, Some((*label).to_string()));
            }
        }
        for _ in 0..self.unlabeled_rows {
            let row = (0..self.width)
                .map(|_| rng.gen_range(-self.jitter..=self.jitter))
                .collect();
            table.push(row, None);
        }
        table
    }

    /// Renders the table as CSV with a leading `FileName` column and a
    /// trailing `Expression` label column.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let table = self.build();
        let mut out = String::from("FileName");
        for name in &table.feature_names {
            out.push(',');
            out.push_str(name);
        }
        out.push_str(",Expression\n");

        for (i, row) in table.rows.iter().enumerate() {
            let _ = write!(out, "img_{i:04}.png");
            for value in &row.features {
                let _ = write!(out, ",{value}");
            }
            let _ = writeln!(out, ",{}", row.label.as_deref().unwrap_or(""));
        }
        out
    }
}

/// The six synthetic labels as a [`LabelSpace`].
///
/// # Panics
///
/// Never; the constant labels are valid.
#[must_use]
#[allow(clippy::expect_used)]
pub fn synthetic_labels() -> LabelSpace {
    LabelSpace::new(SYNTHETIC_LABELS.iter().map(ToString::to_string).collect())
        .expect("synthetic labels are valid")
}

/// A compact architecture over full-width landmark input, fast enough for tests.
#[must_use]
pub fn small_model_config() -> ModelConfig {
    ModelConfig {
        hidden_dim: 16,
        num_heads: 4,
        ..ModelConfig::default()
    }
}

/// Freshly initialized weights, identity stats and synthetic labels: a
/// complete, loadable artifact set.
///
/// # Errors
///
/// Returns an error if model construction or tensor copies fail.
pub fn random_artifacts(
    config: ModelConfig,
    device: &Device,
) -> anyhow::Result<(HashMap<String, Tensor>, NormalizationStats, LabelSpace)> {
    let varmap = VarMap::new();
    let _model = EmotionClassifier::new_trainable(config, &varmap, device)?;
    let weights = emotion_core::training::snapshot(&varmap)?;
    let stats = NormalizationStats::identity(config.input_dim);
    Ok((weights, stats, synthetic_labels()))
}
