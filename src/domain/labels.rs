// ============================================================
// Layer 3 - Labels and Class Statistics
// ============================================================
// Targets are derived from the element list by set membership:
//
//   Binary("Ag")           ["Ag","Cu"] → [1.0]
//                          ["Fe","O"]  → [0.0]
//
//   MultiLabel(Ag,Cu,Fe)   ["Ag","Cu"] → [1.0, 1.0, 0.0]
//
// ClassCounts is what exposes the class imbalance problem:
// with 10% silver samples, a model that always answers "no"
// already scores 90% accuracy (the baseline).

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::domain::sample::Sample;

/// How a sample's element list is turned into a target vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelMode {
    /// One output: is `element` present?
    Binary { element: String },

    /// One output per element (one-hot multi-label vector)
    MultiLabel { elements: Vec<String> },
}

impl LabelMode {
    pub fn binary(element: impl Into<String>) -> Self {
        LabelMode::Binary { element: element.into() }
    }

    /// Build a multi-label mode. Rejects an empty list and duplicates
    /// since either would make the output layer meaningless.
    pub fn multi_label(elements: Vec<String>) -> Result<Self> {
        if elements.is_empty() {
            bail!("Multi-label mode needs at least one target element");
        }
        for (i, e) in elements.iter().enumerate() {
            if elements[..i].contains(e) {
                bail!("Duplicate target element '{e}'");
            }
        }
        Ok(LabelMode::MultiLabel { elements })
    }

    /// Width of the network's output layer
    pub fn num_outputs(&self) -> usize {
        match self {
            LabelMode::Binary { .. }          => 1,
            LabelMode::MultiLabel { elements } => elements.len(),
        }
    }

    /// Names of the output slots, in order
    pub fn label_names(&self) -> Vec<String> {
        match self {
            LabelMode::Binary { element }      => vec![element.clone()],
            LabelMode::MultiLabel { elements } => elements.clone(),
        }
    }

    /// Target vector for one sample: 1.0 where the element is present
    pub fn targets(&self, sample: &Sample) -> Vec<f32> {
        self.label_names()
            .iter()
            .map(|e| if sample.contains(e) { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, LabelMode::Binary { .. })
    }
}

// ─── ClassCounts ──────────────────────────────────────────────────────────────
/// Positive/negative counts for a single binary target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub positive: usize,
    pub negative: usize,
}

impl ClassCounts {
    pub fn count(samples: &[Sample], element: &str) -> Self {
        let positive = samples.iter().filter(|s| s.contains(element)).count();
        Self { positive, negative: samples.len() - positive }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative
    }

    pub fn majority(&self) -> usize {
        self.positive.max(self.negative)
    }

    pub fn minority(&self) -> usize {
        self.positive.min(self.negative)
    }

    pub fn is_balanced(&self) -> bool {
        self.positive == self.negative
    }

    /// Accuracy of always predicting the majority class
    pub fn baseline_accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.majority() as f64 / n as f64,
        }
    }

    pub fn positive_fraction(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.positive as f64 / n as f64,
        }
    }
}

/// Number of samples each element appears in, most frequent first.
/// Ties are broken alphabetically so the output is stable.
pub fn element_frequencies(samples: &[Sample]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for s in samples {
        // An element listed twice in one sample still counts once
        let mut seen: Vec<&str> = Vec::with_capacity(s.elements.len());
        for e in &s.elements {
            if !seen.contains(&e.as_str()) {
                seen.push(e);
                *counts.entry(e).or_insert(0) += 1;
            }
        }
    }

    let mut freq: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(e, n)| (e.to_string(), n))
        .collect();
    freq.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    freq
}
