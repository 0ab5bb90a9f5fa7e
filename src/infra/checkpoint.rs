// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores everything needed to reuse a trained model:
//
//   artifacts/
//     model.mpk.gz          ← weights (full precision, gzipped MessagePack)
//     model_config.json     ← network topology
//     train_config.json     ← labels, preprocessing, hyperparameters
//     history.json          ← per-epoch metrics + early stopping result
//
// The model config is needed to rebuild an identically shaped
// network before the weights can be loaded into it; the train
// config tells inference which labels and preprocessing to use.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{SpectrumClassifier, SpectrumClassifierConfig};
use crate::ml::trainer::TrainingSummary;

const MODEL_FILE:        &str = "model";
const MODEL_CONFIG_FILE: &str = "model_config.json";
const TRAIN_CONFIG_FILE: &str = "train_config.json";
const HISTORY_FILE:      &str = "history.json";

/// f32 weights on disk, so a reloaded model scores exactly like the trained one
type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Manages saving and loading of model artifacts.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create artifact dir '{}': {e}", dir.display());
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save model weights. The recorder adds the `.mpk.gz` extension.
    pub fn save_model<B: Backend>(&self, model: &SpectrumClassifier<B>) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);

        WeightsRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save model to '{}'", path.display())
            })?;

        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Rebuild the network from model_config.json and load the saved
    /// weights into it.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> Result<SpectrumClassifier<B>> {
        let cfg: SpectrumClassifierConfig = self.read_json(MODEL_CONFIG_FILE)?;
        let model = cfg.init::<B>(device);

        let path = self.dir.join(MODEL_FILE);
        let record = WeightsRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load model '{}'. Have you trained the model first?",
                    path.display())
            })?;

        tracing::info!("Loaded model from '{}'", path.display());
        Ok(model.load_record(record))
    }

    pub fn save_model_config(&self, cfg: &SpectrumClassifierConfig) -> Result<()> {
        self.write_json(MODEL_CONFIG_FILE, cfg)
    }

    pub fn load_model_config(&self) -> Result<SpectrumClassifierConfig> {
        self.read_json(MODEL_CONFIG_FILE)
    }

    /// Must be called before training starts so inference can
    /// reproduce labels and preprocessing.
    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG_FILE, cfg)
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        self.read_json(TRAIN_CONFIG_FILE)
    }

    pub fn save_history(&self, summary: &TrainingSummary) -> Result<()> {
        self.write_json(HISTORY_FILE, summary)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read '{}'. Make sure you have run 'train' first.",
                    path.display()
                )
            })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_saved_weights_reload_identically() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();

        let cfg = SpectrumClassifierConfig::new(6, vec![4], 2);
        let model: SpectrumClassifier<TestBackend> = cfg.init(&device);
        ckpt.save_model_config(&cfg).unwrap();
        ckpt.save_model(&model).unwrap();

        assert!(dir.path().join("model.mpk.gz").exists());

        let loaded: SpectrumClassifier<TestBackend> = ckpt.load_model(&device).unwrap();
        let x = Tensor::<TestBackend, 2>::ones([3, 6], &device);
        let a: Vec<f32> = model.forward(x.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.forward(x).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_train_config_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg  = TrainConfig { epochs: 3, ..TrainConfig::default() };
        ckpt.save_train_config(&cfg).unwrap();
        assert_eq!(ckpt.load_train_config().unwrap().epochs, 3);
    }

    #[test]
    fn test_missing_artifacts_explain_what_to_do() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let err  = ckpt.load_train_config().unwrap_err().to_string();
        assert!(err.contains("run 'train' first"));
    }
}
