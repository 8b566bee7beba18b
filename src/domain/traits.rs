// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// Capabilities the training session depends on but does not
// implement itself. The session only sees the trait, so the
// source of the data can change without touching the loop.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::embedding::EmbeddingTable;

// ─── EmbeddingProvider ────────────────────────────────────────────────────────
/// Anything that can produce the pre-trained word-vector table.
///
/// Implementations:
///   - WordVectorFile → reads a plain-text vector file
pub trait EmbeddingProvider {
    /// Load the full table. Called at most once, at model construction.
    fn load_table(&self) -> Result<EmbeddingTable>;
}

