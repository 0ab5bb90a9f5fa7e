// ============================================================
// Layer 2 - Evaluate / Predict Use Cases
// ============================================================
// Both load the artifacts written by `train`:
//
//   evaluate: labelled table → confusion matrix + baseline
//   predict:  table → per-sample probabilities
//
// Labels and preprocessing come from train_config.json so the
// model sees data prepared exactly as during training.

use anyhow::Result;

use crate::data::loader::{validate_shapes, TableLoader};
use crate::domain::{labels::LabelMode, sample::Sample, traits::{Classifier, SampleSource}};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{cpu_device, gpu_device, CpuBackend, DeviceKind, GpuBackend},
    evaluation::{evaluate, EvaluationReport},
    inferencer::Inferencer,
};

/// Probabilities for one input row
#[derive(Debug, Clone)]
pub struct Prediction {
    pub row:           usize,
    pub elements:      Vec<String>,
    pub probabilities: Vec<f32>,
}

pub struct EvaluateUseCase {
    ckpt:       CheckpointManager,
    labels:     LabelMode,
    data_path:  String,
    classifier: Box<dyn Classifier>,
}

impl EvaluateUseCase {
    /// `data_path` defaults to the table the model was trained on.
    pub fn new(artifact_dir: &str, data_path: Option<String>, device: DeviceKind) -> Result<Self> {
        let ckpt      = CheckpointManager::new(artifact_dir);
        let train_cfg = ckpt.load_train_config()?;

        let classifier: Box<dyn Classifier> = match device {
            DeviceKind::Cpu => Box::new(Inferencer::<CpuBackend>::from_checkpoint(&ckpt, cpu_device())?),
            DeviceKind::Gpu => Box::new(Inferencer::<GpuBackend>::from_checkpoint(&ckpt, gpu_device())?),
        };

        Ok(Self {
            labels:    train_cfg.labels.clone(),
            data_path: data_path.unwrap_or(train_cfg.data_path.clone()),
            ckpt,
            classifier,
        })
    }

    pub fn labels(&self) -> &LabelMode {
        &self.labels
    }

    fn load(&self) -> Result<Vec<Sample>> {
        let train_cfg = self.ckpt.load_train_config()?;
        let samples   = TableLoader::new(&self.data_path, train_cfg.columns).load_all()?;
        validate_shapes(&samples)?;
        Ok(samples)
    }

    /// Score the model against the labels derived from the table.
    pub fn evaluate(&self) -> Result<EvaluationReport> {
        let samples = self.load()?;
        let probs   = self.classifier.predict_proba(&samples)?;
        let targets: Vec<Vec<f32>> = samples.iter().map(|s| self.labels.targets(s)).collect();

        let report = evaluate(&probs, &targets, &self.labels.label_names())?;
        tracing::info!(
            "Evaluated {} samples: accuracy {:.1}% vs baseline {:.1}%",
            report.samples,
            report.accuracy() * 100.0,
            report.baseline_accuracy() * 100.0,
        );
        Ok(report)
    }

    /// Probabilities for the first `limit` rows (all rows if None).
    pub fn predict(&self, limit: Option<usize>) -> Result<Vec<Prediction>> {
        let mut samples = self.load()?;
        if let Some(n) = limit {
            samples.truncate(n);
        }
        let probs = self.classifier.predict_proba(&samples)?;

        Ok(samples
            .into_iter()
            .zip(probs)
            .enumerate()
            .map(|(row, (s, probabilities))| Prediction {
                row,
                elements: s.elements,
                probabilities,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::data::{loader::{write_parquet, ColumnNames}, synthetic::{self, SyntheticConfig}};
    use rand::{rngs::StdRng, SeedableRng};

    /// Trains a small model on balanced synthetic data and returns
    /// the artifact dir.
    fn trained(dir: &std::path::Path) -> String {
        let data = dir.join("muon.parquet");
        let cfg  = SyntheticConfig { samples: 200, spectrum_len: 32, silver_fraction: 0.5, noise: 0.01 };
        let samples = synthetic::generate(&cfg, &mut StdRng::seed_from_u64(21)).unwrap();
        write_parquet(&data, &samples, &ColumnNames::default()).unwrap();

        let artifact_dir = dir.join("artifacts").to_string_lossy().into_owned();
        TrainUseCase::new(TrainConfig {
            data_path:     data.to_string_lossy().into_owned(),
            artifact_dir:  artifact_dir.clone(),
            normalization: crate::data::preprocessor::Normalization::MaxScale,
            epochs:        40,
            batch_size:    16,
            lr:            5e-3,
            hidden_sizes:  vec![32, 16],
            plots:         false,
            ..TrainConfig::default()
        })
        .execute()
        .unwrap();
        artifact_dir
    }

    #[test]
    fn test_trained_model_beats_baseline() {
        let dir    = tempfile::tempdir().unwrap();
        let uc     = EvaluateUseCase::new(&trained(dir.path()), None, DeviceKind::Cpu).unwrap();
        let report = uc.evaluate().unwrap();
        assert_eq!(report.samples, 200);
        assert!(report.beats_baseline(), "accuracy {} baseline {}",
            report.accuracy(), report.baseline_accuracy());
    }

    #[test]
    fn test_predict_respects_limit() {
        let dir   = tempfile::tempdir().unwrap();
        let uc    = EvaluateUseCase::new(&trained(dir.path()), None, DeviceKind::Cpu).unwrap();
        let preds = uc.predict(Some(5)).unwrap();
        assert_eq!(preds.len(), 5);
        assert_eq!(preds[4].row, 4);
        assert!(preds.iter().all(|p| p.probabilities.len() == 1));
    }

    #[test]
    fn test_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_string_lossy().into_owned();
        assert!(EvaluateUseCase::new(&dir, None, DeviceKind::Cpu).is_err());
    }
}
