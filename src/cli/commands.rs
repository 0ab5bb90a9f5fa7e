// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Subcommands follow the tutorial order:
//
//   generate → inspect → train → evaluate / predict
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{Error, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{loader::ColumnNames, preprocessor::Normalization, synthetic::SyntheticConfig};
use crate::domain::labels::LabelMode;
use crate::ml::{backend::DeviceKind, early_stopping::Monitor, model::DEFAULT_HIDDEN_SIZES};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print dataset statistics and draw exploratory plots
    Inspect(InspectArgs),

    /// Train the classifier
    Train(TrainArgs),

    /// Score a trained model against a labelled table
    Evaluate(EvaluateArgs),

    /// Print per-sample probabilities from a trained model
    Predict(PredictArgs),

    /// Write a synthetic dataset
    Generate(GenerateArgs),
}

/// Where the table is and what its columns are called
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Sample table (.parquet, .pq or .json)
    #[arg(long, default_value = "data/muon_spectra.parquet")]
    pub data: String,

    /// Column holding the list of element symbols
    #[arg(long, default_value = "elements")]
    pub elements_column: String,

    /// Column holding the spectrum values
    #[arg(long, default_value = "spectrum")]
    pub spectrum_column: String,
}

impl DataArgs {
    pub fn columns(&self) -> ColumnNames {
        ColumnNames {
            elements: self.elements_column.clone(),
            spectrum: self.spectrum_column.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Element whose presence is the classification target
    #[arg(long, default_value = "Ag")]
    pub target: String,

    /// Directory for spectra.png, elements.png and class_balance.png
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Directory for the model, configs, metrics.csv and plots
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Binary target: is this element present?
    #[arg(long, default_value = "Ag")]
    pub target: String,

    /// Multi-label targets, comma separated (overrides --target)
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Downsample the majority class to the minority-class count
    #[arg(long)]
    pub balance: bool,

    #[arg(long, value_enum, default_value_t = Normalization::None)]
    pub normalization: Normalization,

    /// Fraction of samples used for training, the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Maximum number of passes over the training data
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Hidden layer widths, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_HIDDEN_SIZES)]
    pub hidden_sizes: Vec<usize>,

    /// Dropout probability after each hidden layer (0 disables)
    #[arg(long, default_value_t = 0.0)]
    pub dropout: f64,

    /// Stop after this many epochs without improvement
    #[arg(long)]
    pub patience: Option<usize>,

    /// Smallest change that counts as an improvement
    #[arg(long, default_value_t = 0.0)]
    pub min_delta: f64,

    #[arg(long, value_enum, default_value_t = Monitor::ValLoss)]
    pub monitor: Monitor,

    /// Keep the last epoch's weights instead of the best epoch's
    #[arg(long)]
    pub keep_last_weights: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, value_enum, default_value_t = DeviceKind::Cpu)]
    pub device: DeviceKind,

    /// Skip writing loss.png and accuracy.png
    #[arg(long)]
    pub no_plots: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl TryFrom<TrainArgs> for TrainConfig {
    type Error = Error;

    fn try_from(a: TrainArgs) -> Result<Self> {
        let labels = if a.targets.is_empty() {
            LabelMode::binary(a.target)
        } else {
            LabelMode::multi_label(a.targets)?
        };

        Ok(TrainConfig {
            columns:              a.data.columns(),
            data_path:            a.data.data,
            artifact_dir:         a.artifact_dir,
            labels,
            balance:              a.balance,
            normalization:        a.normalization,
            train_fraction:       a.train_fraction,
            batch_size:           a.batch_size,
            epochs:               a.epochs,
            lr:                   a.lr,
            hidden_sizes:         a.hidden_sizes,
            dropout:              a.dropout,
            patience:             a.patience,
            min_delta:            a.min_delta,
            monitor:              a.monitor,
            restore_best_weights: !a.keep_last_weights,
            seed:                 a.seed,
            device:               a.device,
            plots:                !a.no_plots,
        })
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    /// Table to score (defaults to the training table)
    #[arg(long)]
    pub data: Option<String>,

    #[arg(long, value_enum, default_value_t = DeviceKind::Cpu)]
    pub device: DeviceKind,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(long, default_value = "artifacts")]
    pub artifact_dir: String,

    #[arg(long)]
    pub data: Option<String>,

    /// Only print the first N rows
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value_t = DeviceKind::Cpu)]
    pub device: DeviceKind,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[arg(long, default_value = "data/muon_spectra.parquet")]
    pub out: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub samples: usize,

    #[arg(long, default_value_t = 256)]
    pub spectrum_len: usize,

    /// Probability that a sample contains silver
    #[arg(long, default_value_t = 0.1)]
    pub silver_fraction: f64,

    /// Standard deviation of the additive noise
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<&GenerateArgs> for SyntheticConfig {
    fn from(a: &GenerateArgs) -> Self {
        SyntheticConfig {
            samples:         a.samples,
            spectrum_len:    a.spectrum_len,
            silver_fraction: a.silver_fraction,
            noise:           a.noise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_config(args: &[&str]) -> Result<TrainConfig> {
        let cli = Cli::try_parse_from(
            ["muon-ag-classifier", "train"].iter().chain(args.iter()),
        )?;
        match cli.command {
            Commands::Train(a) => TrainConfig::try_from(a),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cfg = train_config(&[]).unwrap();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn test_multi_label_and_early_stopping_flags() {
        let cfg = train_config(&[
            "--targets", "Ag,Cu,Fe",
            "--patience", "5",
            "--monitor", "val-accuracy",
            "--hidden-sizes", "64,32",
            "--dropout", "0.2",
            "--keep-last-weights",
        ])
        .unwrap();

        assert_eq!(cfg.labels.num_outputs(), 3);
        assert_eq!(cfg.patience, Some(5));
        assert_eq!(cfg.monitor, Monitor::ValAccuracy);
        assert_eq!(cfg.hidden_sizes, vec![64, 32]);
        assert_eq!(cfg.dropout, 0.2);
        assert!(!cfg.restore_best_weights);
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        assert!(train_config(&["--targets", "Ag,Ag"]).is_err());
    }
}
