// ============================================================
// Layer 4 - Spectrum Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<SpectrumItem>
// into tensors the model can consume.
//
//   Input:  N items, each with L features and K targets
//   Output: features [N, L] (Float), targets [N, K] (Int 0/1)
//
// All spectra already have the same length (checked by the
// loader), so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SpectrumItem;

// ─── SpectrumBatch ────────────────────────────────────────────────────────────
/// A batch of samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct SpectrumBatch<B: Backend> {
    /// Spectra - shape: [batch_size, spectrum_len]
    pub features: Tensor<B, 2>,

    /// 0/1 labels - shape: [batch_size, num_outputs]
    pub targets: Tensor<B, 2, Int>,
}

// ─── SpectrumBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on it directly.
#[derive(Clone, Debug)]
pub struct SpectrumBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SpectrumBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SpectrumItem, SpectrumBatch<B>> for SpectrumBatcher<B> {
    fn batch(&self, items: Vec<SpectrumItem>) -> SpectrumBatch<B> {
        let batch_size  = items.len();
        let n_features  = items.first().map_or(0, |i| i.features.len());
        let num_outputs = items.first().map_or(0, |i| i.targets.len());

        let features_flat: Vec<f32> = items
            .iter()
            .flat_map(|i| i.features.iter().copied())
            .collect();

        // Targets are exact 0.0 / 1.0 values; the BCE loss wants Int labels
        let targets_flat: Vec<i64> = items
            .iter()
            .flat_map(|i| i.targets.iter().map(|&t| if t >= 0.5 { 1 } else { 0 }))
            .collect();

        let features = Tensor::<B, 2>::from_data(
            TensorData::new(features_flat, [batch_size, n_features]),
            &self.device,
        );
        let targets = Tensor::<B, 2, Int>::from_data(
            TensorData::new(targets_flat, [batch_size, num_outputs]),
            &self.device,
        );

        SpectrumBatch { features, targets }
    }
}
