//! Training loop with best-accuracy checkpointing.

use anyhow::{Context, Result};
use candle_core::{Device, ModuleT};
use candle_nn::{loss, Optimizer, VarMap};
use tracing::{debug, error, info};

use super::checkpoint::{snapshot, CheckpointPolicy};
use super::config::TrainConfig;
use super::data::{BatchIterator, GaussianNoise, PreparedDataset};
use super::metrics::{evaluate, LossAverage};
use super::optim::{clip_grad_norm, Adam, ParamsAdam};
use crate::domain::{LabelSpace, TrainingError};
use crate::inference::EmotionClassifier;
use crate::ports::{
    ArtifactStore, DatasetSource, EpochMetrics, RunSummary, TrainingEvent, TrainingObserver,
};

/// A persisted improvement in validation accuracy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointEvent {
    /// 1-based epoch that produced the weights.
    pub epoch: usize,
    /// Validation accuracy of the weights.
    pub accuracy: f64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Metrics for every epoch that ran.
    pub epochs: Vec<EpochMetrics>,
    /// Checkpoints in the order they were saved.
    pub checkpoints: Vec<CheckpointEvent>,
    /// Accuracy of the retained checkpoint.
    pub best_accuracy: f64,
    /// Epoch of the retained checkpoint.
    pub best_epoch: usize,
    /// Label order persisted with the model.
    pub labels: LabelSpace,
    /// Training rows.
    pub train_rows: usize,
    /// Validation rows.
    pub val_rows: usize,
}

/// Fits an [`EmotionClassifier`] and persists its artifacts.
pub struct Trainer {
    config: TrainConfig,
    device: Device,
}

impl Trainer {
    /// Creates a trainer.
    #[must_use]
    pub const fn new(config: TrainConfig, device: Device) -> Self {
        Self { config, device }
    }

    /// Hyperparameters in use.
    #[must_use]
    pub const fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Loads, prepares and trains in one call.
    ///
    /// # Errors
    ///
    /// Fails on an invalid config, an unreadable or unusable dataset, or
    /// any error from [`Trainer::fit`].
    pub fn run(
        &self,
        source: &dyn DatasetSource,
        store: &dyn ArtifactStore,
        observer: &dyn TrainingObserver,
    ) -> Result<TrainingReport> {
        self.config.validate().context("Invalid training config")?;

        info!("Loading dataset from {}", source.describe());
        let table = source
            .load()
            .with_context(|| format!("Failed to load dataset from {}", source.describe()))?;
        let data = self.prepare(table)?;
        self.fit(&data, store, observer)
    }

    /// Cleans, normalizes and splits a raw table.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidDataset`] if the table cannot be used.
    pub fn prepare(
        &self,
        table: crate::domain::RawTable,
    ) -> std::result::Result<PreparedDataset, TrainingError> {
        PreparedDataset::from_table(table, self.config.val_ratio, self.config.seed)
    }

    /// Trains on prepared data, saving weights on every strict accuracy
    /// improvement and the stats and labels once the loop finishes.
    ///
    /// # Errors
    ///
    /// - [`TrainingError::NonFiniteLoss`] if a batch loss is NaN or infinite;
    ///   nothing further is persisted.
    /// - [`TrainingError::NoCheckpoint`] if accuracy never exceeded zero;
    ///   stats and labels are not persisted.
    /// - Any model, optimizer or store failure.
    #[allow(clippy::too_many_lines)]
    pub fn fit(
        &self,
        data: &PreparedDataset,
        store: &dyn ArtifactStore,
        observer: &dyn TrainingObserver,
    ) -> Result<TrainingReport> {
        let config = &self.config;
        config.validate().context("Invalid training config")?;

        let varmap = VarMap::new();
        let model_config = config.model_config(data.train.width());
        let model = EmotionClassifier::new_trainable(model_config, &varmap, &self.device)
            .context("Failed to create trainable model")?;

        let vars = varmap.all_vars();
        let mut optimizer = Adam::new(
            vars.clone(),
            ParamsAdam {
                lr: config.learning_rate,
                weight_decay: config.weight_decay,
                ..ParamsAdam::default()
            },
        )
        .context("Failed to create optimizer")?;

        let mut batches = BatchIterator::new(&data.train, config.batch_size, &self.device)
            .context("Failed to upload training data")?;
        let mut noise = GaussianNoise::new(config.noise_std, config.seed.wrapping_add(1))?;

        info!(
            "Training: lr={}, wd={}, batch={}, epochs={}, hidden={}, heads={}",
            config.learning_rate,
            config.weight_decay,
            config.batch_size,
            config.epochs,
            config.hidden_dim,
            config.num_heads,
        );
        observer.on_event(TrainingEvent::Started {
            train_rows: data.train.len(),
            val_rows: data.validation.len(),
            epochs: config.epochs,
        });

        let mut policy = CheckpointPolicy::default();
        let mut history = Vec::with_capacity(config.epochs);
        let mut checkpoints = Vec::new();

        for epoch in 1..=config.epochs {
            observer.on_event(TrainingEvent::EpochStarted {
                epoch,
                total: config.epochs,
            });
            batches.reshuffle(config.seed, epoch);

            let mut epoch_loss = LossAverage::default();
            let mut batch = 0;
            while let Some((inputs, labels)) = batches.next_batch()? {
                batch += 1;
                let inputs = match noise.as_mut() {
                    Some(noise) => noise.perturb(&inputs)?,
                    None => inputs,
                };

                let logits = model.forward_t(&inputs, true)?;
                let loss = loss::cross_entropy(&logits, &labels)?;
                let loss_value = loss.to_scalar::<f32>()?;

                if !loss_value.is_finite() {
                    let err = TrainingError::NonFiniteLoss {
                        epoch,
                        batch,
                        loss: loss_value,
                    };
                    error!("{err}");
                    observer.on_event(TrainingEvent::Aborted {
                        epoch,
                        reason: err.to_string(),
                    });
                    return Err(err.into());
                }

                let mut grads = loss.backward()?;
                let norm = clip_grad_norm(&mut grads, &vars, config.max_grad_norm)?;
                optimizer.step(&grads)?;

                debug!("epoch {epoch} batch {batch}: loss={loss_value:.4} grad_norm={norm:.4}");
                epoch_loss.push(f64::from(loss_value));
            }

            let accuracy = evaluate(&model, &data.validation)?;
            let improved = policy.consider(epoch, accuracy);
            if improved {
                let weights = snapshot(&varmap)?;
                store
                    .save_weights(&weights)
                    .with_context(|| format!("Failed to save checkpoint for epoch {epoch}"))?;
                checkpoints.push(CheckpointEvent { epoch, accuracy });
                observer.on_event(TrainingEvent::CheckpointSaved { epoch, accuracy });
            }

            let marker = if improved { " *" } else { "" };
            info!(
                "epoch {epoch:3} | train_loss={:.4} val_acc={accuracy:.4}{marker}",
                epoch_loss.mean()
            );

            let metrics = EpochMetrics {
                epoch,
                train_loss: epoch_loss.mean(),
                val_accuracy: accuracy,
                checkpoint_saved: improved,
            };
            observer.on_event(TrainingEvent::EpochCompleted {
                metrics: metrics.clone(),
            });
            history.push(metrics);
        }

        observer.on_event(TrainingEvent::Finished {
            best_accuracy: policy.best(),
            epochs: config.epochs,
        });

        let Some(best_epoch) = policy.best_epoch() else {
            let err = TrainingError::NoCheckpoint {
                epochs: config.epochs,
            };
            error!("{err}");
            return Err(err.into());
        };

        store
            .save_labels(&data.labels)
            .context("Failed to save label order")?;
        store
            .save_stats(&data.stats)
            .context("Failed to save normalization stats")?;
        store
            .seal(&RunSummary {
                best_accuracy: policy.best(),
                best_epoch,
                epochs: config.epochs,
            })
            .context("Failed to seal artifacts")?;

        info!(
            "Best validation accuracy {:.4} at epoch {best_epoch}; artifacts in {}",
            policy.best(),
            store.describe()
        );

        Ok(TrainingReport {
            epochs: history,
            checkpoints,
            best_accuracy: policy.best(),
            best_epoch,
            labels: data.labels.clone(),
            train_rows: data.train.len(),
            val_rows: data.validation.len(),
        })
    }
}
