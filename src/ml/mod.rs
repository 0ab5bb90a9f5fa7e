// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All Burn-specific model and training code lives here.
//
//   backend.rs        - CPU (NdArray) / GPU (Wgpu) selection
//
//   model.rs          - dense classifier: four decreasing ReLU
//                       layers + output layer, optional dropout,
//                       sigmoid outputs, BCE loss
//
//   trainer.rs        - the fit loop: Adam, per-epoch validation,
//                       metrics logging, early stopping, saving
//
//   early_stopping.rs - patience / min_delta bookkeeping
//
//   inferencer.rs     - loads a saved model, predicts probabilities
//
//   evaluation.rs     - confusion matrices and baseline comparison
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Runtime backend selection
pub mod backend;

/// Dense network architecture
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Early stopping on a monitored validation metric
pub mod early_stopping;

/// Inference engine - loads a checkpoint and predicts
pub mod inferencer;

/// Accuracy, confusion matrix, baseline
pub mod evaluation;
