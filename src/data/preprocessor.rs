// ============================================================
// Layer 4 - Spectrum Preprocessor
// ============================================================
// Turns a raw f64 spectrum into the f32 feature vector the
// network consumes. Three modes:
//
//   None     - values passed through unchanged (the raw spectra
//              are already on a comparable scale)
//   MaxScale - divide by the spectrum's maximum → peak becomes 1.0
//   Log1p    - ln(1 + x), compresses large count differences
//
// Reference: Rust Book §13 (Iterators and Closures)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Normalization {
    #[default]
    None,
    MaxScale,
    Log1p,
}

/// Stateless per-sample transform, so the same preprocessing
/// runs at training and at inference time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor {
    mode: Normalization,
}

impl Preprocessor {
    pub fn new(mode: Normalization) -> Self {
        Self { mode }
    }

    pub fn apply(&self, spectrum: &[f64]) -> Vec<f32> {
        match self.mode {
            Normalization::None => spectrum.iter().map(|&v| v as f32).collect(),

            Normalization::MaxScale => {
                let max = spectrum.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                // An all-zero (or empty) spectrum has nothing to scale
                if max > 0.0 {
                    spectrum.iter().map(|&v| (v / max) as f32).collect()
                } else {
                    spectrum.iter().map(|&v| v as f32).collect()
                }
            }

            Normalization::Log1p => spectrum
                .iter()
                .map(|&v| v.max(0.0).ln_1p() as f32)
                .collect(),
        }
    }
}
