// ============================================================
// Layer 4 — Word Vector File
// ============================================================
// Reads a pre-trained embedding table from a plain-text file.
//
// Format: one vector per line, whitespace-separated floats.
// Line i (0-based, blank lines ignored) is the vector for token
// id i, so the file must already be aligned with the vocabulary
// used to encode the samples:
//
//   0.0 0.0 0.0 0.0          ← token 0
//   0.12 -0.40 0.33 0.91     ← token 1
//   ...
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{ensure, Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::embedding::EmbeddingTable;
use crate::domain::traits::EmbeddingProvider;

pub struct WordVectorFile {
    path: PathBuf,
}

impl WordVectorFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EmbeddingProvider for WordVectorFile {
    fn load_table(&self) -> Result<EmbeddingTable> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read word vectors from '{}'", self.path.display()))?;

        let mut values = Vec::new();
        let mut rows   = 0usize;
        let mut dim    = None;

        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let before = values.len();
            for field in line.split_whitespace() {
                let v: f32 = field.parse().with_context(|| {
                    format!("{}:{}: '{}' is not a number", self.path.display(), line_no + 1, field)
                })?;
                values.push(v);
            }

            let width = values.len() - before;
            let expected = *dim.get_or_insert(width);
            ensure!(
                width == expected,
                "{}:{}: vector has {} values, expected {}",
                self.path.display(),
                line_no + 1,
                width,
                expected
            );
            rows += 1;
        }

        let table = EmbeddingTable::new(rows, dim.unwrap_or(0), values)
            .with_context(|| format!("Invalid word vectors in '{}'", self.path.display()))?;
        tracing::info!(
            "Loaded {} word vectors of size {} from '{}'",
            table.rows(),
            table.dim(),
            self.path.display()
        );
        Ok(table)
    }
}
