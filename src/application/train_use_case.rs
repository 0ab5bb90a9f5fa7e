// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the sample table        (Layer 4 - data)
//   Step 2: Validate spectrum shapes     (Layer 4 - data)
//   Step 3: Report class imbalance       (Layer 3 - domain)
//   Step 4: Downsample majority class    (Layer 4 - data, optional)
//   Step 5: Split train/validation       (Layer 4 - data)
//   Step 6: Build Burn datasets          (Layer 4 - data)
//   Step 7: Save configs                 (Layer 6 - infra)
//   Step 8: Run training loop            (Layer 5 - ml)
//   Step 9: Plot loss/accuracy curves    (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    balancer::downsample,
    dataset::SpectrumDataset,
    loader::{validate_shapes, ColumnNames, TableLoader},
    preprocessor::{Normalization, Preprocessor},
    splitter::split_train_val,
};
use crate::domain::{
    labels::{ClassCounts, LabelMode},
    traits::SampleSource,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger, plots};
use crate::ml::{
    backend::DeviceKind,
    early_stopping::{EarlyStoppingConfig, Monitor},
    model::{SpectrumClassifierConfig, DEFAULT_HIDDEN_SIZES},
    trainer::{run_training, TrainingSinks, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved as train_config.json so
// evaluation reuses the same labels and preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:            String,
    pub artifact_dir:         String,
    pub columns:              ColumnNames,
    pub labels:               LabelMode,
    /// Downsample the majority class before splitting (binary only)
    pub balance:              bool,
    pub normalization:        Normalization,
    pub train_fraction:       f64,
    pub batch_size:           usize,
    pub epochs:               usize,
    pub lr:                   f64,
    pub hidden_sizes:         Vec<usize>,
    pub dropout:              f64,
    /// None disables early stopping
    pub patience:             Option<usize>,
    pub min_delta:            f64,
    pub monitor:              Monitor,
    pub restore_best_weights: bool,
    pub seed:                 u64,
    pub device:               DeviceKind,
    /// Write loss.png / accuracy.png next to the model
    pub plots:                bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:            "data/muon_spectra.parquet".to_string(),
            artifact_dir:         "artifacts".to_string(),
            columns:              ColumnNames::default(),
            labels:               LabelMode::binary("Ag"),
            balance:              false,
            normalization:        Normalization::None,
            train_fraction:       0.8,
            batch_size:           32,
            epochs:               100,
            lr:                   1e-3,
            hidden_sizes:         DEFAULT_HIDDEN_SIZES.to_vec(),
            dropout:              0.0,
            patience:             None,
            min_delta:            0.0,
            monitor:              Monitor::ValLoss,
            restore_best_weights: true,
            seed:                 42,
            device:               DeviceKind::Cpu,
            plots:                true,
        }
    }
}

impl TrainConfig {
    pub fn early_stopping(&self) -> Option<EarlyStoppingConfig> {
        self.patience.map(|patience| EarlyStoppingConfig {
            monitor:              self.monitor,
            min_delta:            self.min_delta,
            patience,
            restore_best_weights: self.restore_best_weights,
        })
    }

    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(self.normalization)
    }

    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            bail!("Epochs must be at least 1");
        }
        if self.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("Dropout must be in [0, 1), got {}", self.dropout);
        }
        if self.hidden_sizes.contains(&0) {
            bail!("Hidden layer widths must be positive");
        }
        if self.balance && !self.labels.is_binary() {
            bail!("Downsampling is only defined for a single binary target");
        }
        Ok(())
    }
}

/// Everything the CLI prints after a run
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub summary:        TrainingSummary,
    /// Class counts of the data the model was trained on (binary only)
    pub class_counts:   Option<ClassCounts>,
    pub train_samples:  usize,
    pub val_samples:    usize,
}

impl TrainReport {
    /// Majority-class accuracy the trained model should beat
    pub fn baseline_accuracy(&self) -> Option<f64> {
        self.class_counts.map(|c| c.baseline_accuracy())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;
        let mut rng = StdRng::seed_from_u64(cfg.seed);

        // ── Step 1-2: Load and validate ───────────────────────────────────────
        let samples = TableLoader::new(&cfg.data_path, cfg.columns.clone()).load_all()?;
        let spectrum_len = validate_shapes(&samples)?;
        tracing::info!("{} samples, {} spectrum bins", samples.len(), spectrum_len);

        // ── Step 3: Class imbalance ───────────────────────────────────────────
        let samples = match &cfg.labels {
            LabelMode::Binary { element } => {
                let counts = ClassCounts::count(&samples, element);
                tracing::info!(
                    "'{}' present in {}/{} samples (baseline accuracy {:.1}%)",
                    element, counts.positive, counts.total(),
                    counts.baseline_accuracy() * 100.0,
                );

                // ── Step 4: Downsample ────────────────────────────────────────
                if cfg.balance {
                    tracing::info!("Downsampling to {} samples per class", counts.minority());
                    let element = element.clone();
                    downsample(samples, |s| s.contains(&element), &mut rng)?
                } else {
                    samples
                }
            }
            LabelMode::MultiLabel { .. } => samples,
        };

        let class_counts = match &cfg.labels {
            LabelMode::Binary { element } => Some(ClassCounts::count(&samples, element)),
            LabelMode::MultiLabel { .. }  => None,
        };

        // ── Step 5: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) = split_train_val(samples, cfg.train_fraction, &mut rng)?;
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        // ── Step 6: Burn datasets ─────────────────────────────────────────────
        let prep          = cfg.preprocessor();
        let train_dataset = SpectrumDataset::from_samples(&train_samples, &cfg.labels, &prep);
        let val_dataset   = SpectrumDataset::from_samples(&val_samples, &cfg.labels, &prep);

        // ── Step 7: Save configs for evaluation ───────────────────────────────
        let model_cfg = SpectrumClassifierConfig::new(
            spectrum_len,
            cfg.hidden_sizes.clone(),
            cfg.labels.num_outputs(),
        )
        .with_dropout(cfg.dropout);

        let ckpt    = CheckpointManager::new(&cfg.artifact_dir);
        let metrics = MetricsLogger::new(&cfg.artifact_dir)?;
        ckpt.save_train_config(cfg)?;
        ckpt.save_model_config(&model_cfg)?;

        // ── Step 8: Training loop (Layer 5) ───────────────────────────────────
        let summary = run_training(
            cfg,
            &model_cfg,
            train_dataset,
            val_dataset,
            TrainingSinks { checkpoints: Some(&ckpt), metrics: Some(&metrics) },
        )?;

        // ── Step 9: Diagnostic plots ──────────────────────────────────────────
        if cfg.plots {
            plot_curves(&summary, Path::new(&cfg.artifact_dir));
        }

        Ok(TrainReport {
            summary,
            class_counts,
            train_samples: train_samples.len(),
            val_samples:   val_samples.len(),
        })
    }
}

/// Plots are diagnostics: a missing font or an unwritable file
/// should not throw away a finished training run.
fn plot_curves(summary: &TrainingSummary, dir: &Path) {
    let loss_path = dir.join("loss.png");
    let acc_path  = dir.join("accuracy.png");

    match plots::plot_loss_curves(&summary.history, &loss_path) {
        Ok(())  => tracing::info!("Loss curve written to '{}'", loss_path.display()),
        Err(e)  => tracing::warn!("Could not plot loss curve: {e:#}"),
    }
    match plots::plot_accuracy_curves(&summary.history, &acc_path) {
        Ok(())  => tracing::info!("Accuracy curve written to '{}'", acc_path.display()),
        Err(e)  => tracing::warn!("Could not plot accuracy curve: {e:#}"),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{loader::write_parquet, synthetic::{self, SyntheticConfig}};

    fn write_dataset(dir: &Path, silver_fraction: f64) -> String {
        let cfg = SyntheticConfig { samples: 120, spectrum_len: 32, silver_fraction, noise: 0.01 };
        let samples = synthetic::generate(&cfg, &mut StdRng::seed_from_u64(3)).unwrap();
        let path = dir.join("muon.parquet");
        write_parquet(&path, &samples, &ColumnNames::default()).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn config(dir: &Path, data_path: String) -> TrainConfig {
        TrainConfig {
            data_path,
            artifact_dir: dir.join("artifacts").to_string_lossy().into_owned(),
            epochs:       3,
            batch_size:   16,
            hidden_sizes: vec![16, 8],
            plots:        false,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_balanced_run_trains_on_equal_classes() {
        let dir = tempfile::tempdir().unwrap();
        let data = write_dataset(dir.path(), 0.2);
        let cfg  = TrainConfig { balance: true, ..config(dir.path(), data) };

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();
        let counts = report.class_counts.unwrap();
        assert!(counts.is_balanced());
        assert_eq!(report.baseline_accuracy(), Some(0.5));
        assert_eq!(report.train_samples + report.val_samples, counts.total());
        assert_eq!(report.summary.epochs_run(), 3);

        let ckpt = CheckpointManager::new(&cfg.artifact_dir);
        assert_eq!(ckpt.load_train_config().unwrap(), cfg);
        assert_eq!(ckpt.load_model_config().unwrap().input_size, 32);
    }

    #[test]
    fn test_multi_label_run() {
        let dir  = tempfile::tempdir().unwrap();
        let data = write_dataset(dir.path(), 0.3);
        let labels = LabelMode::multi_label(vec!["Ag".into(), "Cu".into(), "Fe".into()]).unwrap();
        let cfg = TrainConfig { labels, ..config(dir.path(), data) };

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert!(report.class_counts.is_none());
        let ckpt = CheckpointManager::new(&cfg.artifact_dir);
        assert_eq!(ckpt.load_model_config().unwrap().num_outputs, 3);
    }

    #[test]
    fn test_balancing_multi_label_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            balance: true,
            labels:  LabelMode::multi_label(vec!["Ag".into(), "Cu".into()]).unwrap(),
            ..config(dir.path(), "unused.parquet".into())
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_missing_data_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), dir.path().join("nope.parquet").to_string_lossy().into_owned());
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }

    #[test]
    fn test_early_stopping_config_follows_patience() {
        let cfg = TrainConfig::default();
        assert!(cfg.early_stopping().is_none());

        let cfg = TrainConfig { patience: Some(5), monitor: Monitor::ValAccuracy, ..cfg };
        let es  = cfg.early_stopping().unwrap();
        assert_eq!(es.patience, 5);
        assert_eq!(es.monitor, Monitor::ValAccuracy);
        assert!(es.restore_best_weights);
    }
}
