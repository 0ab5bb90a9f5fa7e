// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Rebuilds a trained network from the artifact directory and
// turns raw samples into per-label probabilities, applying the
// same preprocessing the model was trained with. Samples are fed
// through in fixed-size chunks to bound tensor memory.
use anyhow::{bail, Result};
use burn::prelude::*;

use crate::data::preprocessor::Preprocessor;
use crate::domain::{labels::LabelMode, sample::Sample, traits::Classifier};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::SpectrumClassifier;

/// Samples per forward pass at inference time
const INFER_BATCH: usize = 256;

pub struct Inferencer<B: Backend> {
    model:        SpectrumClassifier<B>,
    labels:       LabelMode,
    preprocessor: Preprocessor,
    input_size:   usize,
    device:       B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt: &CheckpointManager, device: B::Device) -> Result<Self> {
        let train_cfg = ckpt.load_train_config()?;
        let model_cfg = ckpt.load_model_config()?;
        let model     = ckpt.load_model::<B>(&device)?;
        tracing::info!(
            "Inferencer ready: {} inputs, labels {:?}",
            model_cfg.input_size,
            train_cfg.labels.label_names()
        );
        Ok(Self {
            model,
            labels:       train_cfg.labels.clone(),
            preprocessor: train_cfg.preprocessor(),
            input_size:   model_cfg.input_size,
            device,
        })
    }

    fn predict_chunk(&self, samples: &[Sample]) -> Result<Vec<Vec<f32>>> {
        let features: Vec<f32> = samples
            .iter()
            .flat_map(|s| self.preprocessor.apply(&s.spectrum))
            .collect();

        let input = Tensor::<B, 2>::from_data(
            TensorData::new(features, [samples.len(), self.input_size]),
            &self.device,
        );
        let probs: Vec<f32> = self
            .model
            .forward_probs(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Reading predictions: {e:?}"))?;

        Ok(probs
            .chunks(self.labels.num_outputs())
            .map(<[f32]>::to_vec)
            .collect())
    }
}

impl<B: Backend> Classifier for Inferencer<B> {
    fn predict_proba(&self, samples: &[Sample]) -> Result<Vec<Vec<f32>>> {
        if let Some((row, s)) = samples
            .iter()
            .enumerate()
            .find(|(_, s)| s.spectrum_len() != self.input_size)
        {
            bail!(
                "Row {row}: spectrum has {} values but the model expects {}",
                s.spectrum_len(),
                self.input_size
            );
        }

        let mut out = Vec::with_capacity(samples.len());
        for chunk in samples.chunks(INFER_BATCH) {
            out.extend(self.predict_chunk(chunk)?);
        }
        tracing::debug!("Predicted {} samples", out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::backend::{cpu_device, CpuBackend};
    use crate::ml::model::SpectrumClassifierConfig;

    fn checkpoint(dir: &std::path::Path, labels: LabelMode) -> CheckpointManager {
        let ckpt      = CheckpointManager::new(dir);
        let model_cfg = SpectrumClassifierConfig::new(3, vec![4], labels.num_outputs());
        let model: SpectrumClassifier<CpuBackend> = model_cfg.init(&cpu_device());
        ckpt.save_train_config(&TrainConfig { labels, ..TrainConfig::default() }).unwrap();
        ckpt.save_model_config(&model_cfg).unwrap();
        ckpt.save_model(&model).unwrap();
        ckpt
    }

    fn sample(len: usize) -> Sample {
        Sample::new(vec!["Ag".into()], vec![1.0; len])
    }

    #[test]
    fn test_one_probability_vector_per_sample() {
        let dir    = tempfile::tempdir().unwrap();
        let labels = LabelMode::multi_label(vec!["Ag".into(), "Cu".into()]).unwrap();
        let inf    = Inferencer::<CpuBackend>::from_checkpoint(&checkpoint(dir.path(), labels), cpu_device()).unwrap();

        let samples: Vec<Sample> = (0..300).map(|_| sample(3)).collect();
        let probs = inf.predict_proba(&samples).unwrap();
        assert_eq!(probs.len(), 300);
        assert!(probs.iter().all(|p| p.len() == 2));
        assert!(probs.iter().flatten().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_wrong_spectrum_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let inf = Inferencer::<CpuBackend>::from_checkpoint(
            &checkpoint(dir.path(), LabelMode::binary("Ag")),
            cpu_device(),
        )
        .unwrap();
        let err = inf.predict_proba(&[sample(3), sample(5)]).unwrap_err().to_string();
        assert!(err.contains("Row 1"));
    }

    #[test]
    fn test_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(Inferencer::<CpuBackend>::from_checkpoint(&ckpt, cpu_device()).is_err());
    }
}
