// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One labelled example produced by the upstream preprocessing
// pipeline:
//   - a category id (the label)
//   - a fixed-width sequence of token ids (already padded)
//
// On disk a sample is a single row of integers where the first
// value is the label and the remaining values are token ids:
//
//   3, 17, 942, 5, 0, 0, 0
//   │  └──────────────────── tokens (padding width = 6)
//   └─────────────────────── label
//
// Reference: Rust Book §5 (Structs and Methods)

use anyhow::{ensure, Result};

/// A labelled, integer-encoded text sample.
/// Immutable once built: the batcher only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Category id in `0..categories`
    pub label: usize,

    /// Token ids, exactly `padding` long
    pub tokens: Vec<u32>,
}

impl Sample {
    pub fn new(label: usize, tokens: Vec<u32>) -> Self {
        Self { label, tokens }
    }

    /// Build a sample from a raw row `[label, t1, ..., tW]`.
    ///
    /// Rejected: ragged rows (width != `padding`), labels outside
    /// `0..categories` and token ids outside `0..vocab_rows`.
    pub fn from_row(
        row:        &[i64],
        padding:    usize,
        categories: usize,
        vocab_rows: usize,
    ) -> Result<Self> {
        ensure!(
            row.len() == padding + 1,
            "expected 1 label + {} tokens, found {} values",
            padding,
            row.len()
        );

        let label = row[0];
        ensure!(
            label >= 0 && (label as usize) < categories,
            "label {} outside 0..{}",
            label,
            categories
        );

        let tokens = row[1..]
            .iter()
            .map(|&t| {
                ensure!(
                    t >= 0 && (t as u64) < vocab_rows as u64,
                    "token id {} outside the embedding table (0..{})",
                    t,
                    vocab_rows
                );
                Ok(t as u32)
            })
            .collect::<Result<Vec<u32>>>()?;

        Ok(Self::new(label as usize, tokens))
    }

    /// Number of token positions (the padding width)
    pub fn width(&self) -> usize {
        self.tokens.len()
    }
}
