// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Each use case orchestrates the other layers for one command.
//
// Rules for this layer:
//   - No model code or tensor math here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern

// Dataset statistics and exploratory plots
pub mod inspect_use_case;

// The training workflow
pub mod train_use_case;

// Scoring and prediction with a trained model
pub mod evaluate_use_case;

// Synthetic dataset generation
pub mod generate_use_case;
