//! Post-norm transformer encoder layer.
//!
//! Tensor names follow the `self_attn.in_proj_weight` / `linear1` / `norm1`
//! layout so checkpoints keep a stable, framework-neutral naming.

// Allow common ML code patterns
#![allow(clippy::cast_precision_loss)]

use candle_core::{DType, Module, ModuleT, Result, Tensor, D};
use candle_nn::{linear, Dropout, Init, Linear, VarBuilder};

/// Epsilon used by both layer norms.
pub const LAYER_NORM_EPS: f64 = 1e-5;

/// Layer normalization over the last dimension with learned scale and shift.
///
/// Built from primitive tensor ops so it stays differentiable.
pub struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    /// Creates a layer norm of the given width (`weight` = 1, `bias` = 0 when fresh).
    ///
    /// # Errors
    ///
    /// Returns an error if stored weights have the wrong shape.
    pub fn new(size: usize, eps: f64, vb: &VarBuilder) -> Result<Self> {
        let weight = vb.get_with_hints(size, "weight", Init::Const(1.0))?;
        let bias = vb.get_with_hints(size, "bias", Init::Const(0.0))?;
        Ok(Self { weight, bias, eps })
    }
}

impl Module for LayerNorm {
    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let dtype = x.dtype();
        let x = x.to_dtype(DType::F32)?;
        let mean = x.mean_keepdim(D::Minus1)?;
        let centered = x.broadcast_sub(&mean)?;
        let var = centered.sqr()?.mean_keepdim(D::Minus1)?;
        let normed = centered.broadcast_div(&(var + self.eps)?.sqrt()?)?;
        normed
            .to_dtype(dtype)?
            .broadcast_mul(&self.weight)?
            .broadcast_add(&self.bias)
    }
}

/// Multi-head scaled dot-product self-attention with a packed QKV projection.
pub struct SelfAttention {
    in_proj: Linear,
    out_proj: Linear,
    num_heads: usize,
    head_dim: usize,
    dropout: Dropout,
}

impl SelfAttention {
    /// Creates the attention block.
    ///
    /// # Errors
    ///
    /// Returns an error if `hidden` is not divisible by `num_heads` or the
    /// stored weights have the wrong shape.
    pub fn new(hidden: usize, num_heads: usize, dropout: f32, vb: &VarBuilder) -> Result<Self> {
        if num_heads == 0 || hidden % num_heads != 0 {
            candle_core::bail!("hidden width {hidden} is not divisible by {num_heads} heads");
        }
        let in_proj_weight = vb.get_with_hints(
            (3 * hidden, hidden),
            "in_proj_weight",
            candle_nn::init::DEFAULT_KAIMING_NORMAL,
        )?;
        let in_proj_bias = vb.get_with_hints(3 * hidden, "in_proj_bias", Init::Const(0.0))?;
        let out_proj = linear(hidden, hidden, vb.pp("out_proj"))?;

        Ok(Self {
            in_proj: Linear::new(in_proj_weight, Some(in_proj_bias)),
            out_proj,
            num_heads,
            head_dim: hidden / num_heads,
            dropout: Dropout::new(dropout),
        })
    }

    /// Splits `[batch, seq, hidden]` into `[batch, heads, seq, head_dim]`.
    fn split_heads(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq, _) = x.dims3()?;
        x.reshape((batch, seq, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }
}

impl ModuleT for SelfAttention {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let (batch, seq, hidden) = x.dims3()?;

        let qkv = self.in_proj.forward(x)?;
        let q = self.split_heads(&qkv.narrow(D::Minus1, 0, hidden)?)?;
        let k = self.split_heads(&qkv.narrow(D::Minus1, hidden, hidden)?)?;
        let v = self.split_heads(&qkv.narrow(D::Minus1, 2 * hidden, hidden)?)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = q.matmul(&k.t()?.contiguous()?)?.affine(scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let weights = self.dropout.forward(&weights, train)?;

        let context = weights
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq, hidden))?;
        self.out_proj.forward(&context)
    }
}

/// One encoder layer: self-attention and a ReLU feed-forward block, each
/// wrapped in dropout, a residual connection and a trailing layer norm.
pub struct EncoderLayer {
    self_attn: SelfAttention,
    linear1: Linear,
    linear2: Linear,
    norm1: LayerNorm,
    norm2: LayerNorm,
    dropout: Dropout,
    dropout1: Dropout,
    dropout2: Dropout,
}

impl EncoderLayer {
    /// Creates an encoder layer.
    ///
    /// # Errors
    ///
    /// Returns an error if stored weights are missing or mis-shaped.
    pub fn new(
        hidden: usize,
        num_heads: usize,
        feedforward: usize,
        dropout: f32,
        vb: &VarBuilder,
    ) -> Result<Self> {
        Ok(Self {
            self_attn: SelfAttention::new(hidden, num_heads, dropout, &vb.pp("self_attn"))?,
            linear1: linear(hidden, feedforward, vb.pp("linear1"))?,
            linear2: linear(feedforward, hidden, vb.pp("linear2"))?,
            norm1: LayerNorm::new(hidden, LAYER_NORM_EPS, &vb.pp("norm1"))?,
            norm2: LayerNorm::new(hidden, LAYER_NORM_EPS, &vb.pp("norm2"))?,
            dropout: Dropout::new(dropout),
            dropout1: Dropout::new(dropout),
            dropout2: Dropout::new(dropout),
        })
    }
}

impl ModuleT for EncoderLayer {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let attn = self.self_attn.forward_t(x, train)?;
        let x = self
            .norm1
            .forward(&(x + self.dropout1.forward(&attn, train)?)?)?;

        let ff = self.linear1.forward(&x)?.relu()?;
        let ff = self.linear2.forward(&self.dropout.forward(&ff, train)?)?;
        self.norm2
            .forward(&(&x + self.dropout2.forward(&ff, train)?)?)
    }
}
