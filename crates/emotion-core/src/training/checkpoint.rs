//! Best-checkpoint selection.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use candle_core::Tensor;
use candle_nn::VarMap;

/// Keeps the best validation accuracy seen so far.
///
/// Only a strict improvement earns a checkpoint; the initial best is 0.0,
/// so an epoch with zero accuracy never saves.
#[derive(Debug, Default, Clone, Copy)]
pub struct CheckpointPolicy {
    best: f64,
    best_epoch: Option<usize>,
}

impl CheckpointPolicy {
    /// Records `accuracy` for `epoch` and reports whether it is a new best.
    pub fn consider(&mut self, epoch: usize, accuracy: f64) -> bool {
        if accuracy > self.best {
            self.best = accuracy;
            self.best_epoch = Some(epoch);
            true
        } else {
            false
        }
    }

    /// Best accuracy so far.
    #[must_use]
    pub const fn best(&self) -> f64 {
        self.best
    }

    /// Epoch of the retained checkpoint, if any.
    #[must_use]
    pub const fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }
}

/// Copies the current parameter values out of `varmap`.
///
/// The copies do not share storage with the live variables, so later
/// optimizer steps do not change them.
///
/// # Errors
///
/// Returns an error if the var map lock is poisoned or a copy fails.
pub fn snapshot(varmap: &VarMap) -> Result<HashMap<String, Tensor>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("parameter map lock poisoned"))?;
    data.iter()
        .map(|(name, var)| Ok((name.clone(), var.as_tensor().copy()?)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_only_strict_improvement_saves() {
        let mut policy = CheckpointPolicy::default();
        assert!(!policy.consider(1, 0.0));
        assert!(policy.consider(2, 0.4));
        assert!(!policy.consider(3, 0.4));
        assert!(!policy.consider(4, 0.3));
        assert!(policy.consider(5, 0.5));
        assert_eq!(policy.best_epoch(), Some(5));
        assert!((policy.best() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let varmap = VarMap::new();
        let w = varmap
            .get(2, "w", candle_nn::Init::Const(1.0), DType::F32, &Device::Cpu)
            .unwrap();
        let snap = snapshot(&varmap).unwrap();

        let vars = varmap.all_vars();
        vars[0]
            .set(&Tensor::new(&[5.0_f32, 5.0], &Device::Cpu).unwrap())
            .unwrap();

        let saved: Vec<f32> = snap["w"].to_vec1().unwrap();
        assert_eq!(saved, vec![1.0, 1.0]);
        let live: Vec<f32> = w.to_vec1().unwrap();
        assert_eq!(live, vec![5.0, 5.0]);
    }
}
