// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per finished epoch, next to the checkpoints.
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,train_loss,train_accuracy,val_loss,val_accuracy
//   1,1.084512,0.412000,1.052210,0.466667
//   2,0.973300,0.530000,0.951004,0.566667
//   ...
//
// The header is written once; a resumed run keeps appending to
// the same file.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,train_accuracy,val_loss,val_accuracy";

/// One row of the metrics log.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// Epoch number (starts at 1)
    pub epoch: usize,

    pub train_loss:     f64,
    pub train_accuracy: f64,
    pub val_loss:       f64,
    pub val_accuracy:   f64,
}

impl EpochMetrics {
    /// Build a row from finalised `(loss, accuracy)` pairs.
    pub fn new(epoch: usize, train: (f64, f64), validation: (f64, f64)) -> Self {
        Self {
            epoch,
            train_loss:     train.0,
            train_accuracy: train.1,
            val_loss:       validation.0,
            val_accuracy:   validation.1,
        }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open (or start) `metrics.csv` inside `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.train_accuracy,
            m.val_loss,
            m.val_accuracy,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
