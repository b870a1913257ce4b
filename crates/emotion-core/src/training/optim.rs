//! Adam with L2-coupled weight decay, and global gradient clipping.
//!
//! `candle_nn::AdamW` decouples decay from the gradient; this optimizer adds
//! `weight_decay * theta` to the gradient before the moment updates instead.

use candle_core::backprop::GradStore;
use candle_core::{Result, Tensor, Var};
use candle_nn::Optimizer;

/// Adam hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamsAdam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    pub weight_decay: f64,
}

impl Default for ParamsAdam {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

struct VarAdam {
    var: Var,
    first_moment: Var,
    second_moment: Var,
}

/// Adam optimizer.
pub struct Adam {
    vars: Vec<VarAdam>,
    step_t: usize,
    params: ParamsAdam,
}

impl Optimizer for Adam {
    type Config = ParamsAdam;

    fn new(vars: Vec<Var>, params: ParamsAdam) -> Result<Self> {
        let vars = vars
            .into_iter()
            .filter(|var| var.dtype().is_float())
            .map(|var| {
                let first_moment = Var::zeros(var.shape(), var.dtype(), var.device())?;
                let second_moment = Var::zeros(var.shape(), var.dtype(), var.device())?;
                Ok(VarAdam {
                    var,
                    first_moment,
                    second_moment,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            vars,
            step_t: 0,
            params,
        })
    }

    fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.params.lr = lr;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn step(&mut self, grads: &GradStore) -> Result<()> {
        self.step_t += 1;
        let ParamsAdam {
            lr,
            beta1,
            beta2,
            eps,
            weight_decay,
        } = self.params;
        let scale_m = 1.0 / (1.0 - beta1.powi(self.step_t as i32));
        let scale_v = 1.0 / (1.0 - beta2.powi(self.step_t as i32));

        for var in &self.vars {
            let theta = &var.var;
            let Some(g) = grads.get(theta) else {
                continue;
            };
            let g = if weight_decay > 0.0 {
                (g + theta.as_tensor().affine(weight_decay, 0.0)?)?
            } else {
                g.clone()
            };

            let m = &var.first_moment;
            let v = &var.second_moment;
            let next_m = ((m.as_tensor() * beta1)? + (&g * (1.0 - beta1))?)?;
            let next_v = ((v.as_tensor() * beta2)? + (g.sqr()? * (1.0 - beta2))?)?;
            let m_hat = (&next_m * scale_m)?;
            let v_hat = (&next_v * scale_v)?;
            let delta = ((m_hat * lr)? / (v_hat.sqrt()? + eps)?)?;

            theta.set(&theta.as_tensor().sub(&delta)?)?;
            m.set(&next_m)?;
            v.set(&next_v)?;
        }
        Ok(())
    }
}

/// Scales every gradient so the global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
///
/// # Errors
///
/// Returns an error if a tensor operation fails.
pub fn clip_grad_norm(grads: &mut GradStore, vars: &[Var], max_norm: f64) -> Result<f64> {
    let mut total = 0.0_f64;
    for var in vars {
        if let Some(g) = grads.get(var.as_tensor()) {
            let sq = g.sqr()?.sum_all()?.to_dtype(candle_core::DType::F64)?;
            total += sq.to_scalar::<f64>()?;
        }
    }
    let norm = total.sqrt();

    let coef = max_norm / (norm + 1e-6);
    if coef < 1.0 {
        for var in vars {
            let clipped: Option<Tensor> = grads
                .get(var.as_tensor())
                .map(|g| g.affine(coef, 0.0))
                .transpose()?;
            if let Some(clipped) = clipped {
                grads.insert(var.as_tensor(), clipped);
            }
        }
    }
    Ok(norm)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_adam_minimizes_quadratic() {
        let x = Var::new(&[3.0_f32, -2.0], &Device::Cpu).unwrap();
        let mut opt = Adam::new(
            vec![x.clone()],
            ParamsAdam {
                lr: 0.1,
                ..ParamsAdam::default()
            },
        )
        .unwrap();
        for _ in 0..200 {
            let loss = x.as_tensor().sqr().unwrap().sum_all().unwrap();
            opt.backward_step(&loss).unwrap();
        }
        let values: Vec<f32> = x.as_tensor().to_vec1().unwrap();
        assert!(values.iter().all(|v| v.abs() < 0.1), "{values:?}");
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        // Bias-corrected first step is lr * g / (|g| + eps), i.e. ~lr.
        let x = Var::new(&[1.0_f32], &Device::Cpu).unwrap();
        let mut opt = Adam::new(
            vec![x.clone()],
            ParamsAdam {
                lr: 0.01,
                ..ParamsAdam::default()
            },
        )
        .unwrap();
        let loss = x.as_tensor().affine(5.0, 0.0).unwrap().sum_all().unwrap();
        opt.backward_step(&loss).unwrap();
        let value: Vec<f32> = x.as_tensor().to_vec1().unwrap();
        assert!((value[0] - 0.99).abs() < 1e-5);
    }

    fn step_with_decay(weight_decay: f64) -> f32 {
        let x = Var::new(&[2.0_f32], &Device::Cpu).unwrap();
        let mut opt = Adam::new(
            vec![x.clone()],
            ParamsAdam {
                lr: 0.1,
                weight_decay,
                ..ParamsAdam::default()
            },
        )
        .unwrap();
        // d(loss)/dx = -1 pushes x away from zero.
        let loss = x.as_tensor().affine(-1.0, 0.0).unwrap().sum_all().unwrap();
        opt.backward_step(&loss).unwrap();
        x.as_tensor().to_vec1::<f32>().unwrap()[0]
    }

    #[test]
    fn test_weight_decay_pulls_toward_zero() {
        let plain = step_with_decay(0.0);
        // 1.0 * x = 2 outweighs the loss gradient and flips the step.
        let decayed = step_with_decay(1.0);
        assert!((plain - 2.1).abs() < 1e-5, "{plain}");
        assert!((decayed - 1.9).abs() < 1e-5, "{decayed}");
        assert!(decayed.abs() < plain.abs());
    }

    #[test]
    fn test_clip_grad_norm_scales_to_max() {
        let a = Var::new(&[3.0_f32], &Device::Cpu).unwrap();
        let b = Var::new(&[4.0_f32], &Device::Cpu).unwrap();
        // d/da = 3, d/db = 4 -> global norm 5
        let loss = ((a.as_tensor() * 3.0).unwrap() + (b.as_tensor() * 4.0).unwrap())
            .unwrap()
            .sum_all()
            .unwrap();
        let mut grads = loss.backward().unwrap();
        let vars = vec![a.clone(), b.clone()];

        let norm = clip_grad_norm(&mut grads, &vars, 1.0).unwrap();
        assert!((norm - 5.0).abs() < 1e-5);

        let ga: Vec<f32> = grads.get(a.as_tensor()).unwrap().to_vec1().unwrap();
        let gb: Vec<f32> = grads.get(b.as_tensor()).unwrap().to_vec1().unwrap();
        let clipped = ga[0].hypot(gb[0]);
        assert!((clipped - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_clip_grad_norm_leaves_small_gradients() {
        let a = Var::new(&[1.0_f32, 1.0], &Device::Cpu).unwrap();
        let loss = (a.as_tensor() * 0.1).unwrap().sum_all().unwrap();
        let mut grads = loss.backward().unwrap();
        clip_grad_norm(&mut grads, &[a.clone()], 1.0).unwrap();
        let g: Vec<f32> = grads.get(a.as_tensor()).unwrap().to_vec1().unwrap();
        assert!((g[0] - 0.1).abs() < 1e-6);
    }
}
