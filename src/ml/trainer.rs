// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   for each epoch:
//     train:    forward → BCE loss → backward → Adam step
//     validate: model.valid() (inner backend, dropout off)
//     log:      stdout line + metrics.csv row
//     early stopping: snapshot on improvement, stop on patience
//
// Burn notes:
//   - Training runs on an Autodiff backend for gradients
//   - model.valid() returns the model on B::InnerBackend, so the
//     validation batcher must build tensors on that backend too
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SpectrumBatcher, dataset::SpectrumDataset};
use crate::infra::{checkpoint::CheckpointManager, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::backend::{self, CpuTrainBackend, DeviceKind, GpuTrainBackend};
use crate::ml::early_stopping::{Decision, EarlyStopping};
use crate::ml::model::{count_correct, SpectrumClassifier, SpectrumClassifierConfig};

/// Worker threads used by the data loaders
const NUM_WORKERS: usize = 1;

/// What a finished run reports back (also saved as history.json).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub history:       Vec<EpochMetrics>,
    /// Epoch of the best monitored value, if early stopping was on
    pub best_epoch:    Option<usize>,
    pub stopped_early: bool,
    /// Whether the saved weights are the best epoch's, not the last
    pub restored_best: bool,
}

impl TrainingSummary {
    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.history.last()
    }
}

/// Where the trainer writes as it goes. Both are optional so the
/// loop can run in tests without touching the filesystem.
#[derive(Default)]
pub struct TrainingSinks<'a> {
    pub checkpoints: Option<&'a CheckpointManager>,
    pub metrics:     Option<&'a MetricsLogger>,
}

/// Pick the backend from the config and run the loop on it.
pub fn run_training(
    cfg:           &TrainConfig,
    model_cfg:     &SpectrumClassifierConfig,
    train_dataset: SpectrumDataset,
    val_dataset:   SpectrumDataset,
    sinks:         TrainingSinks<'_>,
) -> Result<TrainingSummary> {
    match cfg.device {
        DeviceKind::Cpu => {
            let device = backend::cpu_device();
            tracing::info!("Using NdArray device: {:?}", device);
            let (_, summary) = train_loop::<CpuTrainBackend>(
                cfg, model_cfg, train_dataset, val_dataset, sinks, device,
            )?;
            Ok(summary)
        }
        DeviceKind::Gpu => {
            let device = backend::gpu_device();
            tracing::info!("Using WGPU device: {:?}", device);
            let (_, summary) = train_loop::<GpuTrainBackend>(
                cfg, model_cfg, train_dataset, val_dataset, sinks, device,
            )?;
            Ok(summary)
        }
    }
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    model_cfg:     &SpectrumClassifierConfig,
    train_dataset: SpectrumDataset,
    val_dataset:   SpectrumDataset,
    sinks:         TrainingSinks<'_>,
    device:        B::Device,
) -> Result<(SpectrumClassifier<B>, TrainingSummary)> {
    if train_dataset.is_empty() {
        bail!("Training set is empty");
    }
    if cfg.batch_size == 0 {
        bail!("Batch size must be at least 1");
    }

    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: SpectrumClassifier<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} → {:?} → {} (dropout {})",
        model_cfg.input_size, model_cfg.hidden_sizes, model_cfg.num_outputs, model_cfg.dropout,
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init();

    let has_validation = !val_dataset.is_empty();

    let train_loader = DataLoaderBuilder::new(SpectrumBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(NUM_WORKERS)
        .build(train_dataset);

    // Inner backend, no autodiff overhead
    let val_loader = DataLoaderBuilder::new(SpectrumBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(NUM_WORKERS)
        .build(val_dataset);

    let mut stopper = cfg.early_stopping().map(EarlyStopping::new);
    let mut best_model: Option<SpectrumClassifier<B>> = None;
    let mut history = Vec::with_capacity(cfg.epochs);
    let mut stopped_early = false;

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut cells    = 0usize;

        for batch in train_loader.iter() {
            let (loss, logits) = model.forward_loss(batch.features, batch.targets.clone());

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let (c, n) = count_correct(logits.detach(), batch.targets);
            correct += c;
            cells   += n;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        let train_acc  = if cells   > 0 { correct as f64 / cells as f64 } else { 0.0 };

        // ── Validation phase ──────────────────────────────────────────────────
        let (val_loss, val_acc) = if has_validation {
            let model_valid = model.valid();

            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;
            let mut correct  = 0usize;
            let mut cells    = 0usize;

            for batch in val_loader.iter() {
                let (loss, logits) = model_valid.forward_loss(batch.features, batch.targets.clone());
                loss_sum += loss.into_scalar().elem::<f64>();
                batches  += 1;

                let (c, n) = count_correct(logits, batch.targets);
                correct += c;
                cells   += n;
            }

            (
                Some(loss_sum / batches.max(1) as f64),
                Some(correct as f64 / cells.max(1) as f64),
            )
        } else {
            (None, None)
        };

        let metrics = EpochMetrics { epoch, train_loss, train_acc, val_loss, val_acc };

        println!(
            "Epoch {:>3}/{} | loss={:.4} | acc={:.1}% | val_loss={} | val_acc={}",
            epoch, cfg.epochs, train_loss, train_acc * 100.0,
            val_loss.map_or("-".to_string(), |v| format!("{v:.4}")),
            val_acc.map_or("-".to_string(), |v| format!("{:.1}%", v * 100.0)),
        );

        if let Some(logger) = sinks.metrics {
            logger.log(&metrics)?;
        }

        // ── Early stopping ────────────────────────────────────────────────────
        let decision = stopper
            .as_mut()
            .map(|es| {
                let value = metrics.monitored(es.config().monitor);
                es.on_epoch_end(epoch, value)
            });
        history.push(metrics);

        match decision {
            Some(Decision::Improved) => {
                if cfg.restore_best_weights {
                    best_model = Some(model.clone());
                }
            }
            Some(Decision::Stop) => {
                if let Some(es) = &stopper {
                    tracing::info!(
                        "Early stopping at epoch {} (no improvement for {} epochs, best {:?} = {:?} at epoch {:?})",
                        epoch, es.config().patience, es.config().monitor, es.best_value(), es.best_epoch(),
                    );
                }
                stopped_early = true;
                break;
            }
            Some(Decision::Waiting) | None => {}
        }
    }

    let best_epoch = stopper.as_ref().and_then(EarlyStopping::best_epoch);

    let restored_best = match best_model {
        Some(best) if best_epoch != Some(history.len()) => {
            tracing::info!("Restoring weights from best epoch {:?}", best_epoch);
            model = best;
            true
        }
        _ => false,
    };

    let summary = TrainingSummary { history, best_epoch, stopped_early, restored_best };

    if let Some(ckpt) = sinks.checkpoints {
        ckpt.save_model(&model)?;
        ckpt.save_history(&summary)?;
        tracing::info!("Model saved to '{}'", ckpt.dir().display());
    }

    tracing::info!("Training complete after {} epochs", summary.epochs_run());
    Ok((model, summary))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::SpectrumItem;
    use crate::ml::backend::{cpu_device, CpuTrainBackend};
    use crate::ml::early_stopping::Monitor;

    /// Linearly separable toy set: positives have a high first bin
    fn toy_dataset(n: usize) -> SpectrumDataset {
        SpectrumDataset::new(
            (0..n)
                .map(|i| {
                    let positive = i % 2 == 0;
                    let lead = if positive { 1.0 } else { 0.0 };
                    SpectrumItem {
                        features: vec![lead, 0.5, 1.0 - lead, 0.25],
                        targets:  vec![if positive { 1.0 } else { 0.0 }],
                    }
                })
                .collect(),
        )
    }

    fn config(epochs: usize) -> TrainConfig {
        TrainConfig {
            epochs,
            batch_size:   8,
            lr:           1e-2,
            hidden_sizes: vec![8, 4],
            patience:     None,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_learns_separable_data() {
        let cfg       = config(60);
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        let (_, summary) = train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, toy_dataset(32), toy_dataset(8),
            TrainingSinks::default(), cpu_device(),
        )
        .unwrap();

        assert_eq!(summary.epochs_run(), 60);
        assert!(!summary.stopped_early);
        let first = &summary.history[0];
        let last  = summary.last().unwrap();
        assert!(last.train_loss < first.train_loss);
        // Balanced toy data: baseline is 50%
        assert!(last.val_acc.unwrap() > 0.5);
    }

    #[test]
    fn test_runs_without_validation_set() {
        let cfg       = config(2);
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        let (_, summary) = train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, toy_dataset(8), SpectrumDataset::new(Vec::new()),
            TrainingSinks::default(), cpu_device(),
        )
        .unwrap();
        assert_eq!(summary.epochs_run(), 2);
        assert!(summary.history.iter().all(|m| m.val_loss.is_none()));
    }

    #[test]
    fn test_early_stopping_halts_before_epoch_budget() {
        // lr = 0 freezes the weights, so val_loss never improves after epoch 1
        let cfg = TrainConfig {
            lr:       0.0,
            patience: Some(2),
            monitor:  Monitor::ValLoss,
            ..config(50)
        };
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        let (_, summary) = train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, toy_dataset(16), toy_dataset(8),
            TrainingSinks::default(), cpu_device(),
        )
        .unwrap();

        assert!(summary.stopped_early);
        assert_eq!(summary.epochs_run(), 3);
        assert_eq!(summary.best_epoch, Some(1));
    }

    /// Same spectra as `toy_dataset` with every label inverted, so
    /// validation loss rises as the model learns the training set.
    fn flipped_dataset(n: usize) -> SpectrumDataset {
        let ds = toy_dataset(n);
        SpectrumDataset::new(
            (0..ds.len())
                .filter_map(|i| ds.get(i))
                .map(|item| SpectrumItem {
                    targets: item.targets.iter().map(|t| 1.0 - t).collect(),
                    ..item
                })
                .collect(),
        )
    }

    fn outputs(model: &SpectrumClassifier<CpuTrainBackend>) -> Vec<f32> {
        let input = Tensor::<CpuTrainBackend, 2>::from_data(
            TensorData::new(vec![1.0f32, 0.5, 0.0, 0.25, 0.0, 0.5, 1.0, 0.25], [2, 4]),
            &cpu_device(),
        );
        model.forward(input).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_restores_weights_from_best_epoch() {
        let cfg = TrainConfig {
            patience: Some(3),
            monitor:  Monitor::ValLoss,
            restore_best_weights: true,
            ..config(50)
        };
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        let (restored, summary) = train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, toy_dataset(16), flipped_dataset(8),
            TrainingSinks::default(), cpu_device(),
        )
        .unwrap();

        assert!(summary.stopped_early);
        let best = summary.best_epoch.unwrap();
        assert!(best < summary.epochs_run());
        assert!(summary.restored_best);

        // Same seed, stopped by the epoch budget exactly at the best epoch
        let rerun_cfg = TrainConfig { epochs: best, patience: None, ..cfg.clone() };
        let (at_best, _) = train_loop::<CpuTrainBackend>(
            &rerun_cfg, &model_cfg, toy_dataset(16), flipped_dataset(8),
            TrainingSinks::default(), cpu_device(),
        )
        .unwrap();

        let a = outputs(&restored);
        let b = outputs(&at_best);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6, "restored {a:?} vs best-epoch {b:?}");
        }
    }

    #[test]
    fn test_keeps_last_weights_when_asked() {
        let cfg = TrainConfig {
            patience: Some(3),
            restore_best_weights: false,
            ..config(50)
        };
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        let (_, summary) = train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, toy_dataset(16), flipped_dataset(8),
            TrainingSinks::default(), cpu_device(),
        )
        .unwrap();
        assert!(summary.stopped_early);
        assert!(!summary.restored_best);
    }

    #[test]
    fn test_writes_artifacts_through_sinks() {
        let dir     = tempfile::tempdir().unwrap();
        let ckpt    = CheckpointManager::new(dir.path());
        let metrics = MetricsLogger::new(dir.path()).unwrap();
        let cfg       = config(2);
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        ckpt.save_model_config(&model_cfg).unwrap();

        train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, toy_dataset(8), toy_dataset(4),
            TrainingSinks { checkpoints: Some(&ckpt), metrics: Some(&metrics) },
            cpu_device(),
        )
        .unwrap();

        let history = std::fs::read_to_string(dir.path().join("history.json")).unwrap();
        let history: TrainingSummary = serde_json::from_str(&history).unwrap();
        assert_eq!(history.epochs_run(), 2);
        assert!(dir.path().join("model.mpk.gz").exists());
        let csv = std::fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let cfg       = config(1);
        let model_cfg = SpectrumClassifierConfig::new(4, cfg.hidden_sizes.clone(), 1);
        let result = train_loop::<CpuTrainBackend>(
            &cfg, &model_cfg, SpectrumDataset::new(Vec::new()), toy_dataset(2),
            TrainingSinks::default(), cpu_device(),
        );
        assert!(result.is_err());
    }
}
