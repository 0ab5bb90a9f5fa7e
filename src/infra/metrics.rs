// ============================================================
// Layer 6 - Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Output file: <artifact_dir>/metrics.csv
//
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,0.693100,0.512000,0.690800,0.530000
//   2,0.652400,0.618000,0.661200,0.605000
//   ...
//
// How to read the metrics:
//   - val_loss rising while train_loss keeps falling → overfitting
//     (add dropout or rely on early stopping)
//   - accuracy stuck at the majority-class share → the model is
//     predicting one class only (class imbalance)
//
// The validation columns are empty when the run has no
// validation split.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::ml::early_stopping::Monitor;

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Average binary cross-entropy over all training batches
    pub train_loss: f64,

    /// Elementwise binary accuracy on the training set, in [0, 1]
    pub train_acc: f64,

    pub val_loss: Option<f64>,

    pub val_acc: Option<f64>,
}

impl EpochMetrics {
    /// Value of the monitored metric. Falls back to the training
    /// metric when there is no validation set.
    pub fn monitored(&self, monitor: Monitor) -> f64 {
        match monitor {
            Monitor::ValLoss     => self.val_loss.unwrap_or(self.train_loss),
            Monitor::ValAccuracy => self.val_acc.unwrap_or(self.train_acc),
        }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger, starting a fresh CSV with a header
    /// row. Each training run owns its own metrics file.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,train_acc,val_loss,val_acc")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        let opt = |v: Option<f64>| v.map(|x| format!("{x:.6}")).unwrap_or_default();

        writeln!(
            f,
            "{},{:.6},{:.6},{},{}",
            m.epoch,
            m.train_loss,
            m.train_acc,
            opt(m.val_loss),
            opt(m.val_acc),
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:?}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, val_loss: Option<f64>) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 2.5,
            train_acc:  0.6,
            val_loss,
            val_acc:    val_loss.map(|_| 0.7),
        }
    }

    #[test]
    fn test_monitored_falls_back_to_training_metrics() {
        let m = metrics(1, None);
        assert_eq!(m.monitored(Monitor::ValLoss), 2.5);
        assert_eq!(m.monitored(Monitor::ValAccuracy), 0.6);

        let m = metrics(1, Some(1.0));
        assert_eq!(m.monitored(Monitor::ValLoss), 1.0);
        assert_eq!(m.monitored(Monitor::ValAccuracy), 0.7);
    }

    #[test]
    fn test_csv_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&metrics(1, Some(0.5))).unwrap();
        logger.log(&metrics(2, None)).unwrap();

        let text  = fs::read_to_string(&logger.csv_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,train_acc,val_loss,val_acc");
        assert_eq!(lines[1], "1,2.500000,0.600000,0.500000,0.700000");
        assert_eq!(lines[2], "2,2.500000,0.600000,,");
    }

    #[test]
    fn test_new_logger_starts_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap().log(&metrics(1, None)).unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        let text = fs::read_to_string(&logger.csv_path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
