// ============================================================
// Layer 4 - Synthetic Sample Generator
// ============================================================
// Produces a muon-spectroscopy-like table so the whole pipeline
// can be exercised without the measured dataset.
//
// Each element owns a characteristic peak (position + width) in
// the spectrum. A sample's spectrum is
//
//   flat background + Σ gaussian peaks of its elements + noise
//
// floored at a small positive value, matching the "positive
// reals" shape of the real data. Silver is included with
// `silver_fraction` probability (default 10%), which reproduces
// the class imbalance the tutorial is about.

use anyhow::{Context, Result};
use rand::{seq::SliceRandom, Rng};
use rand_distr::{Distribution, Normal};

use crate::domain::sample::Sample;

/// Elements other than silver that may appear in a sample
const OTHER_ELEMENTS: [&str; 7] = ["Cu", "Fe", "O", "Si", "Al", "Zn", "Ti"];

/// Smallest value a spectrum bin can take
const FLOOR: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub samples:         usize,
    pub spectrum_len:    usize,
    pub silver_fraction: f64,
    pub noise:           f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            samples:         1000,
            spectrum_len:    256,
            silver_fraction: 0.1,
            noise:           0.02,
        }
    }
}

/// Peak centre (as a fraction of the spectrum) and width for an element
fn peak_shape(element: &str) -> (f64, f64) {
    match element {
        "Ag" => (0.62, 0.025),
        "Cu" => (0.55, 0.030),
        "Fe" => (0.30, 0.040),
        "O"  => (0.12, 0.050),
        "Si" => (0.22, 0.035),
        "Al" => (0.18, 0.030),
        "Zn" => (0.70, 0.030),
        _    => (0.40, 0.040),
    }
}

fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Fails only when `noise` is not a valid standard deviation.
pub fn generate<R: Rng + ?Sized>(cfg: &SyntheticConfig, rng: &mut R) -> Result<Vec<Sample>> {
    let noise = Normal::new(0.0, cfg.noise)
        .with_context(|| format!("Invalid noise level {}", cfg.noise))?;
    Ok((0..cfg.samples).map(|_| generate_one(cfg, &noise, rng)).collect())
}

fn generate_one<R: Rng + ?Sized>(cfg: &SyntheticConfig, noise: &Normal<f64>, rng: &mut R) -> Sample {
    let n_other = rng.gen_range(1..=3);
    let mut elements: Vec<String> = OTHER_ELEMENTS
        .choose_multiple(rng, n_other)
        .map(|e| e.to_string())
        .collect();
    if rng.gen_bool(cfg.silver_fraction.clamp(0.0, 1.0)) {
        elements.push("Ag".to_string());
    }
    elements.sort();

    let peaks: Vec<(f64, f64, f64)> = elements
        .iter()
        .map(|e| {
            let (mu, sigma) = peak_shape(e);
            let amplitude   = rng.gen_range(0.4..1.0);
            (mu, sigma, amplitude)
        })
        .collect();

    let background = rng.gen_range(0.05..0.15);
    let len        = cfg.spectrum_len.max(1);
    let spectrum = (0..len)
        .map(|i| {
            let x = i as f64 / len as f64;
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| amp * gaussian(x, mu, sigma))
                .sum();
            (background + signal + noise.sample(rng)).max(FLOOR)
        })
        .collect();

    Sample::new(elements, spectrum)
}
