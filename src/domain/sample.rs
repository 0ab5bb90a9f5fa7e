// ============================================================
// Layer 3 - Sample Domain Type
// ============================================================
// One row of the input table: the chemical elements a material
// sample is made of, and the muon spectroscopy spectrum that was
// measured for it.
//
// Example row:
//   elements: ["Ag", "Cu", "O"]
//   spectrum: [0.031, 0.029, 0.035, ...]   (fixed length, positive)
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// A single labelled-by-composition measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Element symbols present in the sample, e.g. "Ag", "Fe"
    pub elements: Vec<String>,

    /// The measured spectrum. Every sample in a dataset
    /// must have the same number of bins.
    pub spectrum: Vec<f64>,
}

impl Sample {
    pub fn new(elements: Vec<String>, spectrum: Vec<f64>) -> Self {
        Self { elements, spectrum }
    }

    /// Set-membership test on the element list (case-sensitive,
    /// element symbols are already canonical: "Ag" not "AG").
    pub fn contains(&self, element: &str) -> bool {
        self.elements.iter().any(|e| e == element)
    }

    pub fn spectrum_len(&self) -> usize {
        self.spectrum.len()
    }
}
