// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from the raw table on disk to tensor batches.
//
//   .parquet / .json table
//       │
//       ▼
//   TableLoader       → reads rows into Sample { elements, spectrum }
//       │
//       ▼
//   validate_shapes   → every spectrum has the same length
//       │
//       ▼
//   downsample        → optional class balancing (binary target)
//       │
//       ▼
//   split_train_val   → shuffled train / validation sets
//       │
//       ▼
//   Preprocessor      → normalised f32 features
//       │
//       ▼
//   SpectrumDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   SpectrumBatcher   → stacks items into tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads parquet / JSON sample tables, validates shapes
pub mod loader;

/// Spectrum normalisation
pub mod preprocessor;

/// Majority-class downsampling
pub mod balancer;

/// Shuffles and splits data into train/validation sets
pub mod splitter;

/// Implements Burn's Dataset trait for spectrum samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Synthetic muon-like spectra for demos and tests
pub mod synthetic;
