// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Files on disk that outlive a single process:
//
//   checkpoint.rs      — Saving and loading whole sessions
//                        (settings, dataset info, session state
//                        and model weights in one .mpk.gz file)
//
//   metrics.rs         — Epoch-level loss/accuracy CSV next to
//                        the checkpoints
//
//   settings_store.rs  — Reading the JSON run configuration
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Session checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// JSON run configuration loader
pub mod settings_store;
