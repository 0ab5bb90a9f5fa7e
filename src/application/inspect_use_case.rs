// ============================================================
// Layer 2 - InspectUseCase
// ============================================================
// First look at a dataset before training anything:
//
//   - how many samples, how many spectrum bins
//   - which elements occur and how often
//   - how imbalanced the target is, and the accuracy a model
//     gets for free by always predicting the majority class
//
// Optionally draws example spectra, element frequencies and the
// class balance into an output directory.

use anyhow::Result;
use std::{fs, path::PathBuf};

use crate::data::loader::{validate_shapes, ColumnNames, TableLoader};
use crate::domain::{
    labels::{element_frequencies, ClassCounts},
    traits::SampleSource,
};
use crate::infra::plots;

/// Spectra drawn per class in spectra.png
const SPECTRA_PER_CLASS: usize = 3;

pub struct InspectUseCase {
    data_path: String,
    columns:   ColumnNames,
    target:    String,
    out_dir:   Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct InspectReport {
    pub samples:      usize,
    pub spectrum_len: usize,
    pub frequencies:  Vec<(String, usize)>,
    pub target:       String,
    pub class_counts: ClassCounts,
    /// Plot files actually written
    pub plots:        Vec<PathBuf>,
}

impl InspectUseCase {
    pub fn new(
        data_path: impl Into<String>,
        columns:   ColumnNames,
        target:    impl Into<String>,
        out_dir:   Option<PathBuf>,
    ) -> Self {
        Self {
            data_path: data_path.into(),
            columns,
            target:    target.into(),
            out_dir,
        }
    }

    pub fn execute(&self) -> Result<InspectReport> {
        let samples      = TableLoader::new(&self.data_path, self.columns.clone()).load_all()?;
        let spectrum_len = validate_shapes(&samples)?;
        let frequencies  = element_frequencies(&samples);
        let class_counts = ClassCounts::count(&samples, &self.target);

        tracing::info!(
            "'{}': {} positive / {} negative",
            self.target, class_counts.positive, class_counts.negative
        );

        let mut written = Vec::new();
        if let Some(dir) = &self.out_dir {
            fs::create_dir_all(dir)?;

            let spectra = dir.join("spectra.png");
            if let Err(e) = plots::plot_spectra(&samples, &self.target, SPECTRA_PER_CLASS, &spectra) {
                tracing::warn!("Could not plot spectra: {e:#}");
            } else {
                written.push(spectra);
            }

            let elements = dir.join("elements.png");
            if let Err(e) = plots::plot_bar_chart("Samples per element", &frequencies, &elements) {
                tracing::warn!("Could not plot element frequencies: {e:#}");
            } else {
                written.push(elements);
            }

            let balance = dir.join("class_balance.png");
            let bars = vec![
                (format!("with {}", self.target), class_counts.positive),
                (format!("without {}", self.target), class_counts.negative),
            ];
            if let Err(e) = plots::plot_bar_chart("Class balance", &bars, &balance) {
                tracing::warn!("Could not plot class balance: {e:#}");
            } else {
                written.push(balance);
            }
        }

        Ok(InspectReport {
            samples: samples.len(),
            spectrum_len,
            frequencies,
            target: self.target.clone(),
            class_counts,
            plots: written,
        })
    }
}
