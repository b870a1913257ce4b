//! ML inference engine using Candle.
//!
//! Provides the transformer classifier, weight loading and the request-path
//! [`InferenceService`].

mod classifier;
mod device;
mod encoder;
mod loader;
mod service;
mod utils;

pub use classifier::{EmotionClassifier, ModelConfig};
pub use device::get_device;
pub use encoder::{EncoderLayer, LayerNorm, SelfAttention, LAYER_NORM_EPS};
pub use loader::{
    load_safetensors, tensors_from_safetensors, var_builder_from_tensors, vector_from_tensors,
};
pub use service::{InferenceService, ModelContext};
pub use utils::{argmax, softmax};
