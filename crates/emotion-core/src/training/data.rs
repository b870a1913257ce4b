//! Dataset preparation: cleaning, normalization, split and batching.

// Allow common ML code patterns
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use candle_core::{Device, Tensor};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::{debug, info, warn};

use crate::domain::{LabelSpace, NormalizationStats, RawTable, TrainingError, FEATURE_DIM};
use crate::normalize::FeatureNormalizer;

/// A set of normalized rows with their class ids, stored row-major.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    features: Vec<f32>,
    labels: Vec<u32>,
    width: usize,
}

impl Partition {
    /// Gathers `indices` out of `rows` and `labels`.
    #[must_use]
    pub fn gather(rows: &[Vec<f32>], labels: &[u32], indices: &[usize], width: usize) -> Self {
        let mut features = Vec::with_capacity(indices.len() * width);
        let mut picked = Vec::with_capacity(indices.len());
        for &i in indices {
            features.extend_from_slice(&rows[i]);
            picked.push(labels[i]);
        }
        Self {
            features,
            labels: picked,
            width,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Features per row.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// One row's features.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f32] {
        &self.features[index * self.width..(index + 1) * self.width]
    }

    /// All features, row-major.
    #[must_use]
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    /// Mutable access to all features, row-major.
    pub fn features_mut(&mut self) -> &mut [f32] {
        &mut self.features
    }

    /// Class ids aligned with the rows.
    #[must_use]
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Copies the partition into `[rows, width]` features and `[rows]` labels.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor allocation fails.
    pub fn to_tensors(&self, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
        let inputs = Tensor::from_slice(&self.features, (self.len(), self.width), device)?;
        let labels = Tensor::from_slice(&self.labels, self.len(), device)?;
        Ok((inputs, labels))
    }
}

/// Cleaned, normalized and split training data.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// Rows used for gradient updates.
    pub train: Partition,
    /// Held-out rows used to pick checkpoints.
    pub validation: Partition,
    /// Stats fitted over every labeled row.
    pub stats: NormalizationStats,
    /// Sorted label order.
    pub labels: LabelSpace,
    /// Rows dropped for missing labels.
    pub dropped_unlabeled: usize,
    /// Feature values replaced with zero.
    pub imputed_values: usize,
}

impl PreparedDataset {
    /// Runs the preparation pipeline over a raw table.
    ///
    /// Stats are fitted on all labeled rows before the split, so validation
    /// rows contribute to the normalization.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidDataset`] when the table has no
    /// feature columns, ragged rows, the wrong number of distinct labels, or
    /// too few rows to form both partitions.
    pub fn from_table(table: RawTable, val_ratio: f64, seed: u64) -> Result<Self, TrainingError> {
        let width = table.width();
        if width == 0 {
            return Err(TrainingError::InvalidDataset(
                "table has no feature columns".to_string(),
            ));
        }
        if width != FEATURE_DIM {
            warn!("Dataset has {width} feature columns; landmark vectors have {FEATURE_DIM}");
        }

        let total = table.len();
        let mut rows = Vec::with_capacity(total);
        let mut raw_labels = Vec::with_capacity(total);
        let mut imputed_values = 0;
        for (index, row) in table.rows.into_iter().enumerate() {
            if row.features.len() != width {
                return Err(TrainingError::InvalidDataset(format!(
                    "row {index} has {} features, expected {width}",
                    row.features.len()
                )));
            }
            let Some(label) = row.label else {
                continue;
            };
            let mut features = row.features;
            imputed_values += FeatureNormalizer::sanitize_row(&mut features);
            rows.push(features);
            raw_labels.push(label);
        }

        let dropped_unlabeled = total - rows.len();
        if dropped_unlabeled > 0 {
            warn!("Dropped {dropped_unlabeled} rows without a label");
        }
        if imputed_values > 0 {
            info!("Imputed {imputed_values} missing or non-finite feature values with 0");
        }
        if rows.is_empty() {
            return Err(TrainingError::InvalidDataset(
                "dataset has no labeled rows".to_string(),
            ));
        }

        let labels = LabelSpace::from_observed(raw_labels.iter().map(String::as_str))
            .map_err(|e| TrainingError::InvalidDataset(e.to_string()))?;
        let class_ids = raw_labels
            .iter()
            .map(|l| {
                labels
                    .index_of(l)
                    .map(|i| i as u32)
                    .ok_or_else(|| TrainingError::InvalidDataset(format!("unknown label '{l}'")))
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let stats = FeatureNormalizer::fit(&rows)
            .map_err(|e| TrainingError::InvalidDataset(format!("{e:#}")))?;
        for row in &mut rows {
            FeatureNormalizer::apply_in_place(row, &stats);
        }

        let (train_idx, val_idx) = split_indices(rows.len(), val_ratio, seed);
        if train_idx.is_empty() || val_idx.is_empty() {
            return Err(TrainingError::InvalidDataset(format!(
                "{} labeled rows cannot be split into training and validation sets",
                rows.len()
            )));
        }

        let train = Partition::gather(&rows, &class_ids, &train_idx, width);
        let validation = Partition::gather(&rows, &class_ids, &val_idx, width);
        info!(
            "Prepared {} training and {} validation rows over labels {labels}",
            train.len(),
            validation.len()
        );

        Ok(Self {
            train,
            validation,
            stats,
            labels,
            dropped_unlabeled,
            imputed_values,
        })
    }
}

/// Seeded shuffle of `0..n`; the first `ceil(n * val_ratio)` indices are
/// returned second as the validation set.
#[must_use]
pub fn split_indices(n: usize, val_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let val_count = ((n as f64) * val_ratio).ceil() as usize;
    let val_count = val_count.min(n);
    let train = indices.split_off(val_count);
    debug!("Split {n} rows into {} train / {} validation", train.len(), indices.len());
    (train, indices)
}

/// Mini-batch iterator over a partition, reshuffled each epoch.
pub struct BatchIterator {
    inputs: Tensor,
    labels: Tensor,
    indices: Vec<usize>,
    batch_size: usize,
    pos: usize,
}

impl BatchIterator {
    /// Uploads the partition to `device`.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor allocation fails.
    pub fn new(
        partition: &Partition,
        batch_size: usize,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let (inputs, labels) = partition.to_tensors(device)?;
        Ok(Self {
            inputs,
            labels,
            indices: (0..partition.len()).collect(),
            batch_size: batch_size.max(1),
            pos: 0,
        })
    }

    /// Reshuffle for a new epoch using a seeded RNG derived from base seed + epoch.
    pub fn reshuffle(&mut self, seed: u64, epoch: usize) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64));
        self.indices.shuffle(&mut rng);
        self.pos = 0;
    }

    /// Number of batches per epoch.
    #[must_use]
    pub fn batches_per_epoch(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Returns the next mini-batch, or `None` once the epoch is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if indexing the stored tensors fails.
    pub fn next_batch(&mut self) -> candle_core::Result<Option<(Tensor, Tensor)>> {
        let n = self.indices.len();
        if self.pos >= n {
            return Ok(None);
        }

        let end = (self.pos + self.batch_size).min(n);
        let batch_idx: Vec<u32> = self.indices[self.pos..end]
            .iter()
            .map(|&i| i as u32)
            .collect();
        self.pos = end;

        let idx_tensor = Tensor::new(batch_idx.as_slice(), self.inputs.device())?;
        let batch_inputs = self.inputs.index_select(&idx_tensor, 0)?;
        let batch_labels = self.labels.index_select(&idx_tensor, 0)?;
        Ok(Some((batch_inputs, batch_labels)))
    }
}

/// Zero-mean Gaussian feature noise drawn from a seeded stream.
pub struct GaussianNoise {
    rng: ChaCha8Rng,
    dist: Normal<f32>,
}

impl GaussianNoise {
    /// Creates a noise source, or `None` when `std` is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if `std` is negative or not finite.
    pub fn new(std: f32, seed: u64) -> anyhow::Result<Option<Self>> {
        if std == 0.0 {
            return Ok(None);
        }
        let dist = Normal::new(0.0, std)
            .map_err(|e| anyhow::anyhow!("invalid noise std {std}: {e}"))?;
        Ok(Some(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            dist,
        }))
    }

    /// Returns `x` plus fresh noise of the same shape.
    ///
    /// # Errors
    ///
    /// Returns an error if tensor allocation fails.
    pub fn perturb(&mut self, x: &Tensor) -> candle_core::Result<Tensor> {
        let count = x.elem_count();
        let noise: Vec<f32> = (0..count).map(|_| self.dist.sample(&mut self.rng)).collect();
        let noise = Tensor::from_vec(noise, x.dims(), x.device())?;
        x + noise
    }
}
