// ============================================================
// Layer 3 — Settings and Dataset Info
// ============================================================
// Everything a training run is configured with.
//
// Two separate structs, mirroring the shape of the settings file:
//   - Settings     → hyperparameters (what to train and how)
//   - DatasetInfo  → where the preprocessed inputs live
//
// Both are serialised into every checkpoint so a run can be
// rebuilt exactly when it is reloaded. The compute device is the
// one exception: it is chosen per process (settings file or
// command line) and is never written out.
//
// Reference: serde documentation (field attributes)
//            Rust Book §9 (Error Handling)

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rows reserved in the embedding table beyond the vocabulary
/// (unknown-word and padding vectors).
pub const RESERVED_EMBEDDING_ROWS: usize = 2;

// ─── DeviceKind ───────────────────────────────────────────────────────────────
/// Compute target. Read from the settings file or the command line,
/// never written out: a checkpoint trained on a GPU reloads on the CPU
/// unless the caller asks otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Gpu,
}

// ─── MetricDenominator ────────────────────────────────────────────────────────
/// How epoch-level loss and accuracy sums are normalised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDenominator {
    /// Divide by the number of samples in the split.
    #[default]
    Samples,

    /// Divide by `split_size * data_loader_workers`, and scale the
    /// report cadence and progress percentage by the worker count.
    ///
    /// Only the denominator is scaled. The loss sum is still per-sample
    /// (batch mean times batch length), so the resulting loss is not
    /// comparable with logs that summed one mean per batch before
    /// dividing: it comes out larger by roughly the batch size.
    WorkerScaled,
}

// ─── LstmSettings ─────────────────────────────────────────────────────────────
/// Hyperparameters of the LSTM + word-embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmSettings {
    pub batch_size:          usize,
    pub data_loader_workers: usize,
    pub embedding_size:      usize,
    pub lstm_layers:         usize,
    pub lstm_hidden:         usize,
    pub dropout:             f64,
    pub lstm_dropout:        f64,
    pub learning_rate:       f64,
    pub gradient_clip:       f64,
    pub epochs:              usize,

    /// Progress reports (and trailing accuracy points) per epoch
    #[serde(default = "default_report_density")]
    pub report_density: usize,

    #[serde(default)]
    pub metric_denominator: MetricDenominator,

    /// Seeds the backend RNG and enables per-epoch shuffling
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_report_density() -> usize {
    20
}

/// Per-model sub-configurations. Only the LSTM model exists here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub lstm_w2v: LstmSettings,
}

// ─── Settings ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of output classes
    pub categories: usize,

    /// Fixed token sequence length of every sample
    pub padding: usize,

    /// Vocabulary size of the embedding model (without reserved rows)
    pub embeddings: usize,

    pub models: ModelSettings,

    #[serde(skip_serializing, default)]
    pub device: DeviceKind,
}

impl Settings {
    /// Shortcut to the LSTM sub-configuration
    pub fn lstm(&self) -> &LstmSettings {
        &self.models.lstm_w2v
    }

    pub fn lstm_mut(&mut self) -> &mut LstmSettings {
        &mut self.models.lstm_w2v
    }

    /// Rows of the embedding table: vocabulary plus reserved tokens
    pub fn embedding_rows(&self) -> usize {
        self.embeddings + RESERVED_EMBEDDING_ROWS
    }

    /// Reject configurations that cannot drive a training loop.
    pub fn validate(&self) -> Result<()> {
        let m = self.lstm();
        ensure!(self.categories > 0, "categories must be > 0");
        ensure!(self.padding > 0, "padding must be > 0");
        ensure!(m.batch_size > 0, "batch_size must be > 0");
        ensure!(m.data_loader_workers > 0, "data_loader_workers must be > 0");
        ensure!(m.embedding_size > 0, "embedding_size must be > 0");
        ensure!(m.lstm_layers > 0, "lstm_layers must be > 0");
        ensure!(m.lstm_hidden > 0, "lstm_hidden must be > 0");
        ensure!(m.report_density > 0, "report_density must be > 0");
        ensure!(
            (0.0..1.0).contains(&m.dropout) && (0.0..1.0).contains(&m.lstm_dropout),
            "dropout probabilities must be in [0, 1)"
        );
        ensure!(
            m.learning_rate.is_finite() && m.learning_rate > 0.0,
            "learning_rate must be a positive number"
        );
        ensure!(
            m.gradient_clip.is_finite() && m.gradient_clip > 0.0,
            "gradient_clip must be a positive number"
        );
        Ok(())
    }
}

// ─── DatasetInfo ──────────────────────────────────────────────────────────────
/// Locations of the preprocessed splits and the word-vector table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub processed_train_file: PathBuf,
    pub processed_val_file:   PathBuf,
    pub processed_test_file:  PathBuf,

    /// Pre-trained vectors, one row per token id
    #[serde(default)]
    pub embeddings_file: Option<PathBuf>,
}

// ─── RunConfig ────────────────────────────────────────────────────────────────
/// Top-level shape of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub settings: Settings,
    pub info:     DatasetInfo,
}
