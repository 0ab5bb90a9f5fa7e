// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete parquet/JSON readers or the burn model. A new input
// format only needs another SampleSource implementation.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::Sample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Anything that can produce the full table of samples.
///
/// Implementations:
///   - TableLoader → parquet or JSON records file
pub trait SampleSource {
    fn load_all(&self) -> Result<Vec<Sample>>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// Anything that maps samples to per-label probabilities.
///
/// Implementations:
///   - Inferencer → trained dense network loaded from a checkpoint
pub trait Classifier {
    /// One probability vector (length = number of labels) per sample
    fn predict_proba(&self, samples: &[Sample]) -> Result<Vec<Vec<f32>>>;
}
