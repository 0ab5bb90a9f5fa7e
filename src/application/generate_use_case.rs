// ============================================================
// Layer 2 - GenerateUseCase
// ============================================================
// Writes a synthetic dataset in the same parquet layout the
// loader reads, so every other command can be tried without
// the measured data.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;

use crate::data::{
    loader::{write_parquet, ColumnNames},
    synthetic::{generate, SyntheticConfig},
};
use crate::domain::labels::ClassCounts;

pub struct GenerateUseCase {
    out:    PathBuf,
    config: SyntheticConfig,
    seed:   u64,
}

impl GenerateUseCase {
    pub fn new(out: impl Into<PathBuf>, config: SyntheticConfig, seed: u64) -> Self {
        Self { out: out.into(), config, seed }
    }

    /// Returns the silver class counts of what was written.
    pub fn execute(&self) -> Result<ClassCounts> {
        if self.config.samples == 0 || self.config.spectrum_len == 0 {
            bail!("Need at least one sample and one spectrum bin");
        }
        if !(0.0..=1.0).contains(&self.config.silver_fraction) {
            bail!("Silver fraction must be in [0, 1], got {}", self.config.silver_fraction);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let samples = generate(&self.config, &mut rng)?;
        write_parquet(&self.out, &samples, &ColumnNames::default())?;

        let counts = ClassCounts::count(&samples, "Ag");
        tracing::info!(
            "Wrote {} synthetic samples ({} with Ag) to '{}'",
            samples.len(),
            counts.positive,
            self.out.display()
        );
        Ok(counts)
    }
}
