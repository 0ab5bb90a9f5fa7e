// ============================================================
// Layer 5 - Evaluation Metrics
// ============================================================
// Accuracy alone hides the class imbalance problem, so every
// label also gets a confusion matrix and the majority-class
// baseline:
//
//                 predicted 1   predicted 0
//   actual 1          tp            fn
//   actual 0          fp            tn
//
//   precision = tp / (tp + fp)     recall = tp / (tp + fn)
//
// A model with 90% accuracy and recall 0 on a 90/10 dataset has
// learned nothing but the majority class.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::ml::model::DECISION_THRESHOLD;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp:  usize,
    pub fp:  usize,
    pub tn:  usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, probability: f32, target: f32) {
        let predicted = f64::from(probability) > DECISION_THRESHOLD;
        let actual    = target >= 0.5;
        match (predicted, actual) {
            (true,  true)  => self.tp  += 1,
            (true,  false) => self.fp  += 1,
            (false, false) => self.tn  += 1,
            (false, true)  => self.fn_ += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// Accuracy of always predicting the more frequent actual class
    pub fn baseline_accuracy(&self) -> f64 {
        let positives = self.tp + self.fn_;
        let negatives = self.tn + self.fp;
        ratio(positives.max(negatives), self.total())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelReport {
    pub label:  String,
    pub matrix: ConfusionMatrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub samples: usize,
    pub labels:  Vec<LabelReport>,
}

impl EvaluationReport {
    /// Elementwise binary accuracy over every (sample, label) cell
    pub fn accuracy(&self) -> f64 {
        let correct: usize = self.labels.iter().map(|l| l.matrix.tp + l.matrix.tn).sum();
        let total:   usize = self.labels.iter().map(|l| l.matrix.total()).sum();
        ratio(correct, total)
    }

    /// Mean of the per-label baselines
    pub fn baseline_accuracy(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().map(|l| l.matrix.baseline_accuracy()).sum::<f64>()
            / self.labels.len() as f64
    }

    pub fn beats_baseline(&self) -> bool {
        self.accuracy() > self.baseline_accuracy()
    }
}

/// Build per-label confusion matrices from predicted probabilities
/// and 0/1 targets, both `[samples][labels]`.
pub fn evaluate(
    probabilities: &[Vec<f32>],
    targets:       &[Vec<f32>],
    label_names:   &[String],
) -> Result<EvaluationReport> {
    if probabilities.len() != targets.len() {
        bail!(
            "{} predictions for {} targets",
            probabilities.len(),
            targets.len()
        );
    }

    let mut matrices = vec![ConfusionMatrix::default(); label_names.len()];
    for (row, (probs, tgts)) in probabilities.iter().zip(targets).enumerate() {
        if probs.len() != label_names.len() || tgts.len() != label_names.len() {
            bail!(
                "Row {row}: expected {} labels, got {} predictions and {} targets",
                label_names.len(),
                probs.len(),
                tgts.len()
            );
        }
        for (m, (&p, &t)) in matrices.iter_mut().zip(probs.iter().zip(tgts)) {
            m.record(p, t);
        }
    }

    Ok(EvaluationReport {
        samples: probabilities.len(),
        labels:  label_names
            .iter()
            .cloned()
            .zip(matrices)
            .map(|(label, matrix)| LabelReport { label, matrix })
            .collect(),
    })
}
