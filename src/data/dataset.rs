// ============================================================
// Layer 4 — Sample Dataset
// ============================================================
// Reads one preprocessed split (train, validation or test) from
// disk and exposes it through Burn's Dataset trait, so the
// DataLoader can call .get(index) and .len() on it.
//
// File format: one sample per line, integers separated by commas
// and/or whitespace, label first:
//
//   2,17,942,5,0,0
//   0 88 13 401 7 0
//
// Blank lines are skipped. Every other line must hold exactly
// 1 + padding values, with every token id inside the embedding
// table, otherwise the whole file is rejected with the offending
// line number.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use std::{fs, path::Path};

use crate::domain::sample::Sample;

#[derive(Debug)]
pub struct SampleDataset {
    samples: Vec<Sample>,
}

impl SampleDataset {
    pub fn new(samples: Vec<Sample>) -> Self { Self { samples } }

    /// Load and validate every sample of a split file.
    pub fn from_file(
        path:       &Path,
        padding:    usize,
        categories: usize,
        vocab_rows: usize,
    ) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read samples from '{}'", path.display()))?;

        let mut samples = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row = parse_row(line)
                .and_then(|row| Sample::from_row(&row, padding, categories, vocab_rows))
                .with_context(|| format!("{}:{}: malformed sample", path.display(), line_no + 1))?;
            samples.push(row);
        }

        tracing::debug!("Loaded {} samples from '{}'", samples.len(), path.display());
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<Sample> for SampleDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Split a line on commas and whitespace and parse every field.
fn parse_row(line: &str) -> Result<Vec<i64>> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|field| !field.is_empty())
        .map(|field| {
            field
                .parse::<i64>()
                .with_context(|| format!("'{field}' is not an integer"))
        })
        .collect()
}
