// ============================================================
// Layer 5 - Early Stopping
// ============================================================
// Watches one validation metric per epoch and halts training
// once it has stopped improving for `patience` epochs.
//
//   epoch  val_loss   best   wait   decision
//     1     0.60      0.60    0     Improved
//     2     0.55      0.55    0     Improved
//     3     0.56      0.55    1     Waiting
//     4     0.57      0.55    2     Stop      (patience = 2)
//
// The trainer keeps a copy of the weights from the best epoch
// and restores them when `restore_best_weights` is set.
//
// Pure bookkeeping, no Burn types, so it is testable on its own.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which metric to watch, and in which direction it should move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Monitor {
    /// Minimise validation loss
    #[default]
    ValLoss,
    /// Maximise validation accuracy
    ValAccuracy,
}

impl Monitor {
    fn is_better(&self, value: f64, best: f64, min_delta: f64) -> bool {
        match self {
            Monitor::ValLoss     => value < best - min_delta,
            Monitor::ValAccuracy => value > best + min_delta,
        }
    }

    fn worst(&self) -> f64 {
        match self {
            Monitor::ValLoss     => f64::INFINITY,
            Monitor::ValAccuracy => f64::NEG_INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// New best value; the trainer should snapshot the weights
    Improved,
    /// No improvement yet, patience not exhausted
    Waiting,
    /// Patience exhausted, stop training
    Stop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    pub monitor:              Monitor,
    /// Minimum change that counts as an improvement
    pub min_delta:            f64,
    /// Epochs without improvement before stopping
    pub patience:             usize,
    pub restore_best_weights: bool,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    config:     EarlyStoppingConfig,
    best:       f64,
    best_epoch: Option<usize>,
    wait:       usize,
}

impl EarlyStopping {
    pub fn new(config: EarlyStoppingConfig) -> Self {
        let best = config.monitor.worst();
        Self { config, best, best_epoch: None, wait: 0 }
    }

    pub fn config(&self) -> &EarlyStoppingConfig {
        &self.config
    }

    /// Record `value` for `epoch`. A NaN value never counts as an
    /// improvement.
    pub fn on_epoch_end(&mut self, epoch: usize, value: f64) -> Decision {
        if self.config.monitor.is_better(value, self.best, self.config.min_delta) {
            self.best       = value;
            self.best_epoch = Some(epoch);
            self.wait       = 0;
            return Decision::Improved;
        }

        self.wait += 1;
        if self.wait >= self.config.patience {
            Decision::Stop
        } else {
            Decision::Waiting
        }
    }

    pub fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_epoch.map(|_| self.best)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn stopper(monitor: Monitor, patience: usize, min_delta: f64) -> EarlyStopping {
        EarlyStopping::new(EarlyStoppingConfig {
            monitor,
            min_delta,
            patience,
            restore_best_weights: true,
        })
    }

    #[test]
    fn test_stops_after_patience_epochs_without_improvement() {
        let mut es = stopper(Monitor::ValLoss, 2, 0.0);
        assert_eq!(es.on_epoch_end(1, 0.60), Decision::Improved);
        assert_eq!(es.on_epoch_end(2, 0.55), Decision::Improved);
        assert_eq!(es.on_epoch_end(3, 0.56), Decision::Waiting);
        assert_eq!(es.on_epoch_end(4, 0.57), Decision::Stop);
        assert_eq!(es.best_epoch(), Some(2));
        assert_eq!(es.best_value(), Some(0.55));
    }

    #[test]
    fn test_improvement_resets_wait() {
        let mut es = stopper(Monitor::ValLoss, 2, 0.0);
        es.on_epoch_end(1, 1.0);
        assert_eq!(es.on_epoch_end(2, 1.1), Decision::Waiting);
        assert_eq!(es.on_epoch_end(3, 0.9), Decision::Improved);
        assert_eq!(es.on_epoch_end(4, 0.95), Decision::Waiting);
        assert_eq!(es.on_epoch_end(5, 0.95), Decision::Stop);
        assert_eq!(es.best_epoch(), Some(3));
    }

    #[test]
    fn test_accuracy_is_maximised() {
        let mut es = stopper(Monitor::ValAccuracy, 1, 0.0);
        assert_eq!(es.on_epoch_end(1, 0.70), Decision::Improved);
        assert_eq!(es.on_epoch_end(2, 0.80), Decision::Improved);
        assert_eq!(es.on_epoch_end(3, 0.75), Decision::Stop);
        assert_eq!(es.best_epoch(), Some(2));
    }

    #[test]
    fn test_min_delta_ignores_tiny_gains() {
        let mut es = stopper(Monitor::ValLoss, 3, 0.01);
        es.on_epoch_end(1, 0.500);
        assert_eq!(es.on_epoch_end(2, 0.495), Decision::Waiting);
        assert_eq!(es.on_epoch_end(3, 0.480), Decision::Improved);
    }

    #[test]
    fn test_nan_never_improves() {
        let mut es = stopper(Monitor::ValLoss, 1, 0.0);
        assert_eq!(es.on_epoch_end(1, f64::NAN), Decision::Stop);
        assert_eq!(es.best_epoch(), None);
        assert_eq!(es.best_value(), None);
    }
}
