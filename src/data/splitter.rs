// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into two sets:
//   - Training set:   used to update model weights
//   - Validation set: used to watch for overfitting and to
//                     drive early stopping
//
// Shuffling first matters here: tables are often sorted by
// composition, so an unshuffled tail would hold only a few
// element families.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom, seeded
// from the run seed so a split can be reproduced.
//
// Reference: rand crate documentation

use anyhow::{bail, Result};
use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` and split into (train, validation).
///
/// `train_fraction` must be in (0, 1]. The split index is
/// `round(len * train_fraction)`, so 100 samples at 0.8 gives 80/20.
/// Below 1.0 both sides keep at least one sample whenever there are
/// two or more; only a fraction of exactly 1.0 leaves validation empty.
pub fn split_train_val<T, R>(
    mut samples: Vec<T>,
    train_fraction: f64,
    rng: &mut R,
) -> Result<(Vec<T>, Vec<T>)>
where
    R: Rng + ?Sized,
{
    if !(train_fraction > 0.0 && train_fraction <= 1.0) {
        bail!("Train fraction must be in (0, 1], got {train_fraction}");
    }

    samples.shuffle(rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = if train_fraction < 1.0 && total >= 2 {
        split_at.clamp(1, total - 1)
    } else {
        split_at.min(total)
    };

    // split_off(n) leaves [0..n) in `samples` and returns [n..total)
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    Ok((samples, val))
}
