// ============================================================
// Layer 3 — Embedding Table
// ============================================================
// A dense matrix of word vectors, one row per token id:
//
//   row 0        → vector for token id 0
//   row 1        → vector for token id 1
//   ...
//   row rows-1   → vector for the last token id
//
// Stored row-major in a flat Vec so it can be handed to the
// tensor library in one piece. The table is only needed while
// the model is being constructed; the model owns its own copy
// of the weights afterwards.

use anyhow::{ensure, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingTable {
    rows:   usize,
    dim:    usize,
    values: Vec<f32>,
}

impl EmbeddingTable {
    /// Build a table from row-major values. Fails if the value count
    /// does not match `rows * dim`.
    pub fn new(rows: usize, dim: usize, values: Vec<f32>) -> Result<Self> {
        ensure!(rows > 0 && dim > 0, "embedding table must be non-empty");
        ensure!(
            values.len() == rows * dim,
            "embedding table has {} values, expected {} x {}",
            values.len(),
            rows,
            dim
        );
        Ok(Self { rows, dim, values })
    }

    /// All-zero table, used when no pre-trained vectors are loaded.
    pub fn zeros(rows: usize, dim: usize) -> Self {
        Self { rows, dim, values: vec![0.0; rows * dim] }
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn dim(&self) -> usize { self.dim }

    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}
