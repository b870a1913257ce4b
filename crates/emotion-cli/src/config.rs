//! Configuration file support for the emotion CLI.
//!
//! Supports TOML configuration from:
//! - XDG config: `~/.config/emotion/config.toml` (lowest priority)
//! - Project-local: `.emotion.toml` (searched up directory tree)
//! - CLI flags (highest priority, applied separately)

use std::path::{Path, PathBuf};

use emotion_core::{ModelConfig, TrainConfig, FEATURE_DIM};
use serde::Deserialize;
use tracing::{debug, info};

/// Project-local config file name.
pub const PROJECT_CONFIG_FILE: &str = ".emotion.toml";

/// Top-level configuration structure.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Hyperparameters and model shape.
    pub training: TrainingConfig,
    /// CSV layout.
    pub dataset: DatasetConfig,
    /// Artifact location.
    pub artifacts: ArtifactsConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Training configuration.
///
/// The model shape fields (`hidden_dim`, `num_layers`, `num_heads`) are also
/// used when loading artifacts for inference, so they must match the run
/// that produced them.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: Option<usize>,
    pub batch_size: Option<usize>,
    pub learning_rate: Option<f64>,
    pub weight_decay: Option<f64>,
    pub dropout: Option<f32>,
    pub noise_std: Option<f32>,
    /// Fraction of rows held out for validation (0.0-1.0, exclusive).
    pub val_ratio: Option<f64>,
    pub seed: Option<u64>,
    pub max_grad_norm: Option<f64>,
    pub hidden_dim: Option<usize>,
    pub num_layers: Option<usize>,
    pub num_heads: Option<usize>,
}

/// Dataset layout configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Default CSV path for `emotion train`.
    pub path: Option<PathBuf>,
    /// Column holding the emotion label.
    pub label_column: Option<String>,
    /// Columns that are neither features nor the label.
    pub exclude_columns: Option<Vec<String>>,
}

/// Artifact configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Custom artifacts directory path.
    pub dir: Option<PathBuf>,
}

/// Server configuration.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:5000`.
    pub addr: Option<String>,
}

impl AppConfig {
    /// Load configuration from XDG and project-local files.
    ///
    /// Priority (lowest to highest):
    /// 1. XDG config: `~/.config/emotion/config.toml`
    /// 2. Project-local: `.emotion.toml` (searched up from cwd)
    ///
    /// Missing files are silently ignored. Invalid values are logged as warnings.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(xdg_path) = xdg_config_path() {
            if xdg_path.exists() {
                info!("Loading XDG config: {}", xdg_path.display());
                if let Some(xdg_config) = load_file(&xdg_path) {
                    config = xdg_config;
                }
            } else {
                debug!("XDG config not found: {}", xdg_path.display());
            }
        }

        if let Some(project_path) = find_project_config() {
            info!("Loading project config: {}", project_path.display());
            if let Some(project_config) = load_file(&project_path) {
                config.merge(project_config);
            }
        }

        if let Err(e) = config.validate() {
            eprintln!("warning: {e}");
        }

        config
    }

    /// Validate configuration values are within acceptable ranges.
    fn validate(&self) -> Result<(), String> {
        let t = &self.training;
        for (name, value) in [
            ("training.epochs", t.epochs),
            ("training.batch_size", t.batch_size),
            ("training.hidden_dim", t.hidden_dim),
            ("training.num_layers", t.num_layers),
            ("training.num_heads", t.num_heads),
        ] {
            if value == Some(0) {
                return Err(format!("{name} must be at least 1"));
            }
        }
        if let (Some(hidden), Some(heads)) = (t.hidden_dim, t.num_heads) {
            if hidden % heads != 0 {
                return Err(format!(
                    "training.hidden_dim ({hidden}) must be divisible by training.num_heads ({heads})"
                ));
            }
        }
        if let Some(r) = t.val_ratio {
            if !(r > 0.0 && r < 1.0) {
                return Err(format!("training.val_ratio must be between 0.0 and 1.0, got {r}"));
            }
        }
        if let Some(d) = t.dropout {
            if !(0.0..1.0).contains(&d) {
                return Err(format!("training.dropout must be 0.0-1.0, got {d}"));
            }
        }
        if let Some(lr) = t.learning_rate {
            if lr <= 0.0 || !lr.is_finite() {
                return Err(format!("training.learning_rate must be positive, got {lr}"));
            }
        }
        if let Some(n) = t.noise_std {
            if n < 0.0 || !n.is_finite() {
                return Err(format!("training.noise_std must not be negative, got {n}"));
            }
        }

        if let Some(ref addr) = self.server.addr {
            if addr.parse::<std::net::SocketAddr>().is_err() {
                return Err(format!("server.addr must be host:port, got '{addr}'"));
            }
        }

        Ok(())
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` when present.
    fn merge(&mut self, other: Self) {
        let (t, o) = (&mut self.training, other.training);
        t.epochs = o.epochs.or(t.epochs);
        t.batch_size = o.batch_size.or(t.batch_size);
        t.learning_rate = o.learning_rate.or(t.learning_rate);
        t.weight_decay = o.weight_decay.or(t.weight_decay);
        t.dropout = o.dropout.or(t.dropout);
        t.noise_std = o.noise_std.or(t.noise_std);
        t.val_ratio = o.val_ratio.or(t.val_ratio);
        t.seed = o.seed.or(t.seed);
        t.max_grad_norm = o.max_grad_norm.or(t.max_grad_norm);
        t.hidden_dim = o.hidden_dim.or(t.hidden_dim);
        t.num_layers = o.num_layers.or(t.num_layers);
        t.num_heads = o.num_heads.or(t.num_heads);

        self.dataset.path = other.dataset.path.or_else(|| self.dataset.path.take());
        self.dataset.label_column = other
            .dataset
            .label_column
            .or_else(|| self.dataset.label_column.take());
        self.dataset.exclude_columns = other
            .dataset
            .exclude_columns
            .or_else(|| self.dataset.exclude_columns.take());

        self.artifacts.dir = other.artifacts.dir.or_else(|| self.artifacts.dir.take());

        self.server.addr = other.server.addr.or_else(|| self.server.addr.take());
    }

    /// Training hyperparameters with unset fields taken from the defaults.
    #[must_use]
    pub fn train_config(&self) -> TrainConfig {
        let d = TrainConfig::default();
        let t = &self.training;
        TrainConfig {
            epochs: t.epochs.unwrap_or(d.epochs),
            batch_size: t.batch_size.unwrap_or(d.batch_size),
            learning_rate: t.learning_rate.unwrap_or(d.learning_rate),
            weight_decay: t.weight_decay.unwrap_or(d.weight_decay),
            dropout: t.dropout.unwrap_or(d.dropout),
            noise_std: t.noise_std.unwrap_or(d.noise_std),
            val_ratio: t.val_ratio.unwrap_or(d.val_ratio),
            seed: t.seed.unwrap_or(d.seed),
            max_grad_norm: t.max_grad_norm.unwrap_or(d.max_grad_norm),
            hidden_dim: t.hidden_dim.unwrap_or(d.hidden_dim),
            num_layers: t.num_layers.unwrap_or(d.num_layers),
            num_heads: t.num_heads.unwrap_or(d.num_heads),
        }
    }

    /// Model shape expected of served artifacts.
    #[must_use]
    pub fn model_config(&self) -> ModelConfig {
        self.train_config().model_config(FEATURE_DIM)
    }
}

/// Get the XDG config file path.
fn xdg_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("emotion").join("config.toml"))
}

/// Find project-local config by searching up from current directory.
fn find_project_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_in_parents(&cwd)
}

/// Search for `.emotion.toml` in the given directory and its parents.
fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        let config_path = dir.join(PROJECT_CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }
        current = dir.parent();
    }

    None
}

/// Load and parse a TOML config file.
fn load_file(path: &Path) -> Option<AppConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };

    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.training.epochs.is_none());
        assert!(config.dataset.label_column.is_none());
        assert!(config.server.addr.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str("").expect("parse empty config");
        assert!(config.artifacts.dir.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r"
[training]
epochs = 10
batch_size = 16
learning_rate = 0.001
weight_decay = 0.0
dropout = 0.1
noise_std = 0.0
val_ratio = 0.25
seed = 7
max_grad_norm = 5.0
hidden_dim = 64
num_layers = 2
num_heads = 4

[dataset]
path = 'data/landmarks.csv'
label_column = 'emotion'
exclude_columns = ['FileName', 'Subject']

[artifacts]
dir = '/tmp/emotion'

[server]
addr = '0.0.0.0:8080'
";
        let config: AppConfig = toml::from_str(toml).expect("parse full config");

        assert_eq!(config.training.epochs, Some(10));
        assert_eq!(config.training.learning_rate, Some(0.001));
        assert_eq!(config.training.num_heads, Some(4));
        assert_eq!(config.dataset.label_column, Some("emotion".to_string()));
        assert_eq!(
            config.dataset.exclude_columns,
            Some(vec!["FileName".to_string(), "Subject".to_string()])
        );
        assert_eq!(config.artifacts.dir, Some(PathBuf::from("/tmp/emotion")));
        assert_eq!(config.server.addr, Some("0.0.0.0:8080".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_configs() {
        let mut base: AppConfig = toml::from_str(
            r"
[training]
epochs = 5
seed = 1

[server]
addr = '127.0.0.1:5000'
",
        )
        .expect("parse base");

        let override_config: AppConfig = toml::from_str(
            r"
[training]
epochs = 20

[dataset]
label_column = 'label'
",
        )
        .expect("parse override");

        base.merge(override_config);

        assert_eq!(base.training.epochs, Some(20));
        assert_eq!(base.training.seed, Some(1));
        assert_eq!(base.dataset.label_column, Some("label".to_string()));
        assert_eq!(base.server.addr, Some("127.0.0.1:5000".to_string()));
    }

    #[test]
    fn test_merge_empty_override_preserves_base() {
        let mut base: AppConfig = toml::from_str(
            r"
[artifacts]
dir = 'models'
",
        )
        .expect("parse base");

        base.merge(AppConfig::default());

        assert_eq!(base.artifacts.dir, Some(PathBuf::from("models")));
    }

    #[test]
    fn test_train_config_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r"
[training]
epochs = 3
hidden_dim = 16
num_heads = 4
",
        )
        .expect("parse training");

        let train = config.train_config();
        let defaults = TrainConfig::default();
        assert_eq!(train.epochs, 3);
        assert_eq!(train.hidden_dim, 16);
        assert_eq!(train.num_heads, 4);
        assert_eq!(train.batch_size, defaults.batch_size);
        assert_eq!(train.seed, defaults.seed);
        assert!(train.validate().is_ok());
    }

    #[test]
    fn test_model_config_follows_training_shape() {
        let config: AppConfig = toml::from_str(
            r"
[training]
hidden_dim = 32
num_layers = 2
",
        )
        .expect("parse training");

        let model = config.model_config();
        assert_eq!(model.input_dim, FEATURE_DIM);
        assert_eq!(model.hidden_dim, 32);
        assert_eq!(model.num_layers, 2);
        assert_eq!(model.num_heads, ModelConfig::default().num_heads);
    }

    #[test]
    fn test_invalid_toml_syntax_handled() {
        let toml = r"
[training
epochs = 5
";
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "invalid TOML should return error");
    }

    #[test]
    fn test_invalid_field_type_handled() {
        let toml = r#"
[training]
epochs = "many"
"#;
        let result: Result<AppConfig, _> = toml::from_str(toml);
        assert!(result.is_err(), "type mismatch should return error");
    }

    #[test]
    fn test_validate_zero_epochs() {
        let mut config = AppConfig::default();
        config.training.epochs = Some(0);

        let result = config.validate();
        assert!(result.unwrap_err().contains("training.epochs"));
    }

    #[test]
    fn test_validate_heads_must_divide_hidden() {
        let mut config = AppConfig::default();
        config.training.hidden_dim = Some(30);
        config.training.num_heads = Some(8);

        let result = config.validate();
        assert!(result.unwrap_err().contains("divisible"));
    }

    #[test]
    fn test_validate_val_ratio_out_of_range() {
        for ratio in [0.0, 1.0, 1.5] {
            let mut config = AppConfig::default();
            config.training.val_ratio = Some(ratio);
            assert!(config.validate().unwrap_err().contains("training.val_ratio"));
        }
    }

    #[test]
    fn test_validate_server_addr() {
        let mut config = AppConfig::default();
        config.server.addr = Some("localhost".to_string());
        assert!(config.validate().unwrap_err().contains("server.addr"));

        config.server.addr = Some("127.0.0.1:5000".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_config_passes() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_find_config_in_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "").unwrap();

        let found = find_config_in_parents(&nested).unwrap();
        assert_eq!(found, dir.path().join(PROJECT_CONFIG_FILE));
    }
}
