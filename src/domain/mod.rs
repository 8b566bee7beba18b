// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing a training run:
// samples, settings, the durable session state and the
// embedding table.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A labelled, integer-encoded text sample
pub mod sample;

// Hyperparameters, dataset locations and the settings file shape
pub mod settings;

// Epoch counter, metric histories and trailing accuracy
pub mod session_state;

// Pre-trained word vectors
pub mod embedding;

// Capabilities the session consumes
pub mod traits;
