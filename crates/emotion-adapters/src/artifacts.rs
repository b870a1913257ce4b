//! Filesystem artifact store.
//!
//! Layout of an artifact directory:
//!
//! ```text
//! emotion_model.safetensors   model weights (overwritten on every checkpoint)
//! mean.safetensors            tensor "mean", f32 [features]
//! std.safetensors             tensor "std",  f32 [features]
//! labels.json                 JSON array of the six labels in class-id order
//! manifest.json               SHA-256 of the four files above, written last
//! ```

use anyhow::{bail, Context, Result};
use candle_core::{Device, Tensor};
use emotion_core::domain::{LabelSpace, NormalizationStats};
use emotion_core::inference::{tensors_from_safetensors, vector_from_tensors};
use emotion_core::ports::{ArtifactStore, RunSummary};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

/// Model weights file.
pub const WEIGHTS_FILE: &str = "emotion_model.safetensors";
/// Feature means file.
pub const MEAN_FILE: &str = "mean.safetensors";
/// Feature standard deviations file.
pub const STD_FILE: &str = "std.safetensors";
/// Label order file.
pub const LABELS_FILE: &str = "labels.json";
/// Binding manifest file.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Files covered by the manifest, in write order.
pub const ARTIFACT_FILES: &[&str] = &[WEIGHTS_FILE, MEAN_FILE, STD_FILE, LABELS_FILE];

/// Returns the default artifacts directory path.
///
/// Uses `XDG_DATA_HOME/emotion/artifacts` or `~/.local/share/emotion/artifacts`.
#[must_use]
pub fn artifacts_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emotion")
        .join("artifacts")
}

/// Record binding the four artifacts of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Identifier derived from the artifact digests.
    pub run_id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Validation accuracy of the saved weights.
    pub best_accuracy: f64,
    /// Epoch that produced the saved weights.
    pub best_epoch: usize,
    /// Epochs the run completed.
    pub epochs: usize,
    /// Hex SHA-256 per file name.
    pub files: BTreeMap<String, String>,
}

/// Presence and size of one artifact file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    /// File name within the directory.
    pub name: &'static str,
    /// Full path.
    pub path: PathBuf,
    /// Size in bytes, or `None` when missing.
    pub size: Option<u64>,
}

impl ArtifactStatus {
    /// True when the file exists.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.size.is_some()
    }
}

/// Lists every artifact file of `dir`, including the manifest.
#[must_use]
pub fn list_artifacts(dir: &Path) -> Vec<ArtifactStatus> {
    ARTIFACT_FILES
        .iter()
        .chain(std::iter::once(&MANIFEST_FILE))
        .map(|&name| {
            let path = dir.join(name);
            let size = fs::metadata(&path).ok().map(|m| m.len());
            ArtifactStatus { name, path, size }
        })
        .collect()
}

/// Artifact store backed by a directory.
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store at [`artifacts_dir`].
    #[must_use]
    pub fn at_default_location() -> Self {
        Self::new(artifacts_dir())
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!(
                "Failed to create artifacts directory: {}",
                self.dir.display()
            )
        })
    }

    /// Writes `bytes` to `name` via a temporary file and rename, so readers
    /// never see a partial file.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_dir()?;
        let target = self.path(name);
        let tmp = self.path(&format!(".{name}.tmp"));
        fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &target)
            .with_context(|| format!("Failed to replace {}", target.display()))?;
        debug!("Wrote {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path(name);
        fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn load_vector(&self, name: &str, tensor: &str) -> Result<Vec<f32>> {
        let bytes = self.read(name)?;
        let tensors = tensors_from_safetensors(&bytes, &Device::Cpu)
            .with_context(|| format!("Failed to decode {name}"))?;
        vector_from_tensors(&tensors, tensor).with_context(|| format!("Failed to read {name}"))
    }

    /// Reads the manifest, or `None` if the directory has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest exists but cannot be read or parsed.
    pub fn read_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.path(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let manifest = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(manifest))
    }

    fn digest(&self, name: &str) -> Result<String> {
        let bytes = self.read(name)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

fn vector_bytes(name: &str, values: &[f32]) -> Result<Vec<u8>> {
    let data: &[u8] = bytemuck::cast_slice(values);
    let view = safetensors::tensor::TensorView::new(
        safetensors::Dtype::F32,
        vec![values.len()],
        data,
    )
    .with_context(|| format!("Failed to build tensor '{name}'"))?;
    safetensors::serialize([(name, view)], &None)
        .with_context(|| format!("Failed to serialize tensor '{name}'"))
}

impl ArtifactStore for FsArtifactStore {
    fn save_weights(&self, tensors: &HashMap<String, Tensor>) -> Result<()> {
        self.ensure_dir()?;
        let target = self.path(WEIGHTS_FILE);
        let tmp = self.path(&format!(".{WEIGHTS_FILE}.tmp"));
        candle_core::safetensors::save(tensors, &tmp)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &target)
            .with_context(|| format!("Failed to replace {}", target.display()))?;
        debug!("Saved {} tensors to {}", tensors.len(), target.display());
        Ok(())
    }

    fn save_stats(&self, stats: &NormalizationStats) -> Result<()> {
        self.write_atomic(MEAN_FILE, &vector_bytes("mean", stats.mean())?)?;
        self.write_atomic(STD_FILE, &vector_bytes("std", stats.std())?)
    }

    fn save_labels(&self, labels: &LabelSpace) -> Result<()> {
        let json = serde_json::to_vec_pretty(labels).context("Failed to serialize labels")?;
        self.write_atomic(LABELS_FILE, &json)
    }

    fn seal(&self, summary: &RunSummary) -> Result<()> {
        let mut files = BTreeMap::new();
        let mut run_hasher = Sha256::new();
        for &name in ARTIFACT_FILES {
            let digest = self.digest(name)?;
            run_hasher.update(digest.as_bytes());
            files.insert(name.to_string(), digest);
        }
        let run_id = format!("{:x}", run_hasher.finalize());

        let manifest = Manifest {
            run_id: run_id[..16].to_string(),
            created_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .context("Failed to format timestamp")?,
            best_accuracy: summary.best_accuracy,
            best_epoch: summary.best_epoch,
            epochs: summary.epochs,
            files,
        };
        let json = serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;
        self.write_atomic(MANIFEST_FILE, &json)?;
        info!("Sealed artifacts as run {}", manifest.run_id);
        Ok(())
    }

    fn load_weights(&self, device: &Device) -> Result<HashMap<String, Tensor>> {
        let bytes = self.read(WEIGHTS_FILE)?;
        tensors_from_safetensors(&bytes, device)
            .with_context(|| format!("Failed to decode {WEIGHTS_FILE}"))
    }

    fn load_stats(&self) -> Result<NormalizationStats> {
        let mean = self.load_vector(MEAN_FILE, "mean")?;
        let std = self.load_vector(STD_FILE, "std")?;
        Ok(NormalizationStats::new(mean, std)?)
    }

    fn load_labels(&self) -> Result<LabelSpace> {
        let bytes = self.read(LABELS_FILE)?;
        serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {LABELS_FILE}"))
    }

    fn verify(&self) -> Result<()> {
        let Some(manifest) = self.read_manifest()? else {
            warn!(
                "No {MANIFEST_FILE} in {}; artifacts cannot be checked for a common run",
                self.dir.display()
            );
            return Ok(());
        };

        for (name, expected) in &manifest.files {
            let actual = self
                .digest(name)
                .with_context(|| format!("{name} is listed in the manifest but unreadable"))?;
            if actual != *expected {
                bail!(
                    "{name} does not match run {} (expected sha256 {expected}, found {actual})",
                    manifest.run_id
                );
            }
        }
        debug!("Artifacts match run {}", manifest.run_id);
        Ok(())
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
