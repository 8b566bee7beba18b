// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// The model and everything that drives it.
//
//   model.rs       — LSTM text classifier
//                    • Word embeddings (pre-trained or zero)
//                    • Stacked LSTM layers with dropout between
//                    • Last time step → dropout → linear
//                    • Log-softmax over categories
//
//   accumulator.rs — Running loss/accuracy sums, metric
//                    normalisation and progress-report cadence
//
//   trainer.rs     — One training epoch (forward, NLL loss,
//                    backward, clipped Adam step) and the
//                    epoch Phase type
//
//   gradients.rs   — Global L2 gradient-norm clipping
//
//   evaluator.rs   — Forward-only pass for validation and test
//
//   session.rs     — TrainingSession: owns model, loaders and
//                    state, steps Training → Validating → Done
//
//   backend.rs     — CPU (ndarray) / GPU (wgpu) selection
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hochreiter & Schmidhuber (1997) Long Short-Term Memory

/// LSTM + word-embedding classifier
pub mod model;

/// Metric sums, normalisation and report cadence
pub mod accumulator;

/// Per-epoch training loop
pub mod trainer;

/// Validation / test inference pass
pub mod evaluator;

/// Global gradient-norm clipping
pub mod gradients;

/// Training session and epoch state machine
pub mod session;

/// CPU / GPU backend dispatch
pub mod backend;
