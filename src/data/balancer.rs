// ============================================================
// Layer 4 - Class Balancer (Downsampling)
// ============================================================
// With few silver samples, a network can reach high accuracy
// by always answering "no Ag". Downsampling fixes the class
// ratio before training:
//
//   before:  900 negative, 100 positive
//   after:   100 negative (drawn with replacement), 100 positive
//
// The majority class is sampled WITH replacement, so the same
// sample may appear more than once in the balanced set. Every
// minority sample is kept exactly once. The result is shuffled
// so the two classes are interleaved.

use anyhow::{bail, Result};
use rand::{seq::SliceRandom, Rng};

use crate::domain::sample::Sample;

/// Balance `samples` so both classes of `is_positive` have the
/// minority-class count.
pub fn downsample<R, F>(samples: Vec<Sample>, is_positive: F, rng: &mut R) -> Result<Vec<Sample>>
where
    R: Rng + ?Sized,
    F: Fn(&Sample) -> bool,
{
    if samples.is_empty() {
        bail!("Cannot balance an empty dataset");
    }

    let (positive, negative): (Vec<Sample>, Vec<Sample>) =
        samples.into_iter().partition(|s| is_positive(s));

    if positive.is_empty() || negative.is_empty() {
        bail!(
            "Cannot balance classes: {} positive, {} negative samples",
            positive.len(),
            negative.len()
        );
    }

    let (minority, majority) = if positive.len() <= negative.len() {
        (positive, negative)
    } else {
        (negative, positive)
    };

    let n = minority.len();
    let mut balanced: Vec<Sample> = (0..n)
        .map(|_| majority[rng.gen_range(0..majority.len())].clone())
        .collect();
    balanced.extend(minority);
    balanced.shuffle(rng);

    tracing::info!(
        "Downsampled majority class from {} to {} (total {})",
        majority.len(),
        n,
        balanced.len()
    );
    Ok(balanced)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::labels::ClassCounts;
    use rand::{rngs::StdRng, SeedableRng};

    fn dataset(positives: usize, negatives: usize) -> Vec<Sample> {
        let pos = (0..positives).map(|i| Sample::new(vec!["Ag".into()], vec![i as f64]));
        let neg = (0..negatives).map(|i| Sample::new(vec!["Fe".into()], vec![1000.0 + i as f64]));
        pos.chain(neg).collect()
    }

    #[test]
    fn test_balanced_counts_are_equal() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = downsample(dataset(10, 90), |s| s.contains("Ag"), &mut rng).unwrap();
        let counts = ClassCounts::count(&out, "Ag");
        assert_eq!(counts, ClassCounts { positive: 10, negative: 10 });
        assert!(counts.is_balanced());
    }

    #[test]
    fn test_minority_kept_exactly_once() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = downsample(dataset(5, 50), |s| s.contains("Ag"), &mut rng).unwrap();
        let mut pos: Vec<f64> = out
            .iter()
            .filter(|s| s.contains("Ag"))
            .map(|s| s.spectrum[0])
            .collect();
        pos.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(pos, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_positive_majority_is_downsampled() {
        let mut rng = StdRng::seed_from_u64(3);
        let out = downsample(dataset(40, 4), |s| s.contains("Ag"), &mut rng).unwrap();
        assert_eq!(ClassCounts::count(&out, "Ag"), ClassCounts { positive: 4, negative: 4 });
    }

    #[test]
    fn test_majority_drawn_from_original_pool() {
        let mut rng = StdRng::seed_from_u64(11);
        let out = downsample(dataset(3, 20), |s| s.contains("Ag"), &mut rng).unwrap();
        assert!(out
            .iter()
            .filter(|s| !s.contains("Ag"))
            .all(|s| (1000.0..1020.0).contains(&s.spectrum[0])));
    }

    #[test]
    fn test_single_class_cannot_be_balanced() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(downsample(dataset(0, 10), |s| s.contains("Ag"), &mut rng).is_err());
        assert!(downsample(Vec::new(), |s| s.contains("Ag"), &mut rng).is_err());
    }
}
