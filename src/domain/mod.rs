// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust structs and traits describing the problem:
// samples, labels derived from them, and class statistics.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// One measured sample: element list + spectrum
pub mod sample;

// Target derivation (binary / multi-label) and class counts
pub mod labels;

// Core abstractions (traits) that other layers implement
pub mod traits;
