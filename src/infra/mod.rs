// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several layers:
//
//   checkpoint.rs - model weights (Burn MessagePack recorder) plus the
//                   JSON configs and history needed to reuse them
//
//   metrics.rs    - per-epoch metrics appended to metrics.csv
//
//   plots.rs      - PNG charts: training curves, example spectra,
//                   element frequencies, class balance
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Diagnostic charts (plotters)
pub mod plots;
