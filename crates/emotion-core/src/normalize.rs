//! Per-feature standardization shared by training and inference.
//!
//! The same [`FeatureNormalizer::apply`] runs on every training row and on
//! every request vector, so serve-time inputs see exactly the transform the
//! model was trained on.

// Statistics accumulate in f64 and are stored as f32
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

use anyhow::{bail, Result};
use tracing::debug;

use crate::domain::NormalizationStats;

/// Added to every fitted standard deviation and used as the division floor.
pub const STD_EPSILON: f32 = 1e-8;

/// Stateless feature normalizer.
pub struct FeatureNormalizer;

impl FeatureNormalizer {
    /// Replaces NaN and infinite values with zero.
    #[must_use]
    pub fn sanitize_value(value: f32) -> f32 {
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }

    /// Replaces NaN and infinite values in a row with zero, in place.
    ///
    /// Returns the number of values replaced.
    pub fn sanitize_row(row: &mut [f32]) -> usize {
        let mut replaced = 0;
        for value in row.iter_mut().filter(|v| !v.is_finite()) {
            *value = 0.0;
            replaced += 1;
        }
        replaced
    }

    /// Computes column-wise mean and population standard deviation.
    ///
    /// Non-finite inputs count as zero, so a corrupt row cannot poison the
    /// statistics. The input is not modified. Each std carries
    /// [`STD_EPSILON`].
    ///
    /// # Errors
    ///
    /// Fails on an empty table or rows of unequal width.
    pub fn fit<R: AsRef<[f32]>>(rows: &[R]) -> Result<NormalizationStats> {
        let Some(first) = rows.first() else {
            bail!("cannot fit normalization stats on an empty table");
        };
        let width = first.as_ref().len();
        if width == 0 {
            bail!("cannot fit normalization stats on zero feature columns");
        }

        let mut sum = vec![0.0_f64; width];
        for (index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != width {
                bail!(
                    "row {index} has {} features, expected {width}",
                    row.len()
                );
            }
            for (acc, &value) in sum.iter_mut().zip(row) {
                *acc += f64::from(Self::sanitize_value(value));
            }
        }

        let n = rows.len() as f64;
        let mean: Vec<f64> = sum.into_iter().map(|s| s / n).collect();

        let mut sq_dev = vec![0.0_f64; width];
        for row in rows {
            for ((acc, &value), &m) in sq_dev.iter_mut().zip(row.as_ref()).zip(&mean) {
                let d = f64::from(Self::sanitize_value(value)) - m;
                *acc += d * d;
            }
        }

        let std: Vec<f32> = sq_dev
            .into_iter()
            .map(|s| (s / n).sqrt() as f32 + STD_EPSILON)
            .collect();
        let mean: Vec<f32> = mean.into_iter().map(|m| m as f32).collect();

        debug!("Fitted normalization stats over {} rows x {width} features", rows.len());
        Ok(NormalizationStats::new(mean, std)?)
    }

    /// Returns `(value - mean) / std` element-wise.
    ///
    /// The caller guarantees `values.len() == stats.len()`; any excess on
    /// either side is ignored.
    #[must_use]
    pub fn apply(values: &[f32], stats: &NormalizationStats) -> Vec<f32> {
        values
            .iter()
            .zip(stats.mean())
            .zip(stats.std())
            .map(|((&x, &m), &s)| (x - m) / s.max(STD_EPSILON))
            .collect()
    }

    /// Normalizes a row in place.
    pub fn apply_in_place(values: &mut [f32], stats: &NormalizationStats) {
        for ((x, &m), &s) in values.iter_mut().zip(stats.mean()).zip(stats.std()) {
            *x = (*x - m) / s.max(STD_EPSILON);
        }
    }

    /// Inverse of [`FeatureNormalizer::apply`]: `value * std + mean`.
    #[must_use]
    pub fn invert(values: &[f32], stats: &NormalizationStats) -> Vec<f32> {
        values
            .iter()
            .zip(stats.mean())
            .zip(stats.std())
            .map(|((&x, &m), &s)| x.mul_add(s.max(STD_EPSILON), m))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_mean_and_population_std() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let stats = FeatureNormalizer::fit(&rows).unwrap();
        assert_eq!(stats.mean(), &[2.0, 10.0]);
        // Population std of [1, 3] is 1; constant column collapses to epsilon.
        assert!((stats.std()[0] - 1.0).abs() < 1e-6);
        assert_eq!(stats.std()[1], STD_EPSILON);
    }

    #[test]
    fn test_fit_imputes_non_finite_as_zero() {
        let rows = vec![
            vec![2.0, f32::NAN],
            vec![4.0, f32::INFINITY],
            vec![f32::NEG_INFINITY, 6.0],
        ];
        let stats = FeatureNormalizer::fit(&rows).unwrap();
        assert!((stats.mean()[0] - 2.0).abs() < 1e-6);
        assert!((stats.mean()[1] - 2.0).abs() < 1e-6);
        assert!(stats.std().iter().all(|s| s.is_finite() && *s > 0.0));
    }

    #[test]
    fn test_fit_does_not_mutate_input() {
        let rows = vec![vec![f32::NAN, 1.0], vec![2.0, 3.0]];
        let _ = FeatureNormalizer::fit(&rows).unwrap();
        assert!(rows[0][0].is_nan());
    }

    #[test]
    fn test_fit_rejects_empty_and_ragged() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert!(FeatureNormalizer::fit(&empty).is_err());

        let ragged = vec![vec![1.0, 2.0], vec![1.0]];
        let err = FeatureNormalizer::fit(&ragged).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_apply_then_invert_roundtrips() {
        let stats =
            NormalizationStats::new(vec![0.5, -2.0, 100.0, 0.0], vec![0.1, 3.0, 25.0, 1e-8])
                .unwrap();
        let values = vec![0.73, -1.0, 140.0, 0.0];
        let normalized = FeatureNormalizer::apply(&values, &stats);
        let restored = FeatureNormalizer::invert(&normalized, &stats);
        for (a, b) in values.iter().zip(&restored) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn test_apply_with_identity_stats_is_noop() {
        let stats = NormalizationStats::identity(3);
        let values = [0.0, -1.5, 2.25];
        assert_eq!(FeatureNormalizer::apply(&values, &stats), values.to_vec());
    }

    #[test]
    fn test_apply_in_place_matches_apply() {
        let stats = NormalizationStats::new(vec![1.0, 2.0], vec![2.0, 4.0]).unwrap();
        let mut values = vec![5.0, 10.0];
        let expected = FeatureNormalizer::apply(&values, &stats);
        FeatureNormalizer::apply_in_place(&mut values, &stats);
        assert_eq!(values, expected);
        assert_eq!(values, vec![2.0, 2.0]);
    }

    #[test]
    fn test_sanitize_row_counts_replacements() {
        let mut row = vec![1.0, f32::NAN, f32::INFINITY, -2.0];
        assert_eq!(FeatureNormalizer::sanitize_row(&mut row), 2);
        assert_eq!(row, vec![1.0, 0.0, 0.0, -2.0]);
    }
}
