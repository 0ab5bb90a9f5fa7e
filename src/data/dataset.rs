use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::preprocessor::Preprocessor;
use crate::domain::{labels::LabelMode, sample::Sample};

/// One network-ready sample: preprocessed spectrum + target vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumItem {
    pub features: Vec<f32>,
    pub targets:  Vec<f32>,
}

impl SpectrumItem {
    pub fn from_sample(sample: &Sample, labels: &LabelMode, prep: &Preprocessor) -> Self {
        Self {
            features: prep.apply(&sample.spectrum),
            targets:  labels.targets(sample),
        }
    }
}

pub struct SpectrumDataset {
    items: Vec<SpectrumItem>,
}

impl SpectrumDataset {
    pub fn new(items: Vec<SpectrumItem>) -> Self { Self { items } }

    pub fn from_samples(samples: &[Sample], labels: &LabelMode, prep: &Preprocessor) -> Self {
        Self::new(
            samples
                .iter()
                .map(|s| SpectrumItem::from_sample(s, labels, prep))
                .collect(),
        )
    }
}

impl Dataset<SpectrumItem> for SpectrumDataset {
    fn get(&self, index: usize) -> Option<SpectrumItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
