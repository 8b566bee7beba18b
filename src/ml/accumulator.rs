// ============================================================
// Layer 5 — Metric Accumulator and Report Cadence
// ============================================================
// Running sums for one pass over one data split:
//
//   loss     → sum of per-sample losses
//   correct  → number of rows whose arg-max matched the label
//   seen     → samples processed so far
//   batches  → batches processed so far
//
// The accumulator knows nothing about tensors; the loop hands it
// host values after every batch.
//
// ReportCadence decides at which batch counts a progress report
// (and a trailing-accuracy point) is due, and how far through the
// split that batch is.

use crate::domain::settings::{LstmSettings, MetricDenominator};
use crate::domain::session_state::ProgressPercent;

// ─── MetricAccumulator ────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricAccumulator {
    loss:    f64,
    correct: usize,
    seen:    usize,
    batches: usize,
}

impl MetricAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch. `batch_loss` is the sum of the batch's per-sample
    /// losses; `predictions` are arg-max category ids aligned with `labels`.
    pub fn add(&mut self, batch_loss: f64, predictions: &[i64], labels: &[i64]) {
        debug_assert_eq!(predictions.len(), labels.len());
        self.loss    += batch_loss;
        self.correct += predictions
            .iter()
            .zip(labels)
            .filter(|(p, l)| p == l)
            .count();
        self.seen    += labels.len();
        self.batches += 1;
    }

    pub fn batches(&self) -> usize { self.batches }

    pub fn seen(&self) -> usize { self.seen }

    pub fn correct(&self) -> usize { self.correct }

    /// `(loss, accuracy)` per sample seen so far. Zero before any batch.
    pub fn snapshot(&self) -> (f64, f64) {
        ratio(self.loss, self.correct, self.seen as f64)
    }

    /// Epoch-level `(loss, accuracy)` for a finished pass.
    pub fn finalize(&self, normalization: &Normalization) -> (f64, f64) {
        ratio(self.loss, self.correct, normalization.denominator())
    }
}

fn ratio(loss: f64, correct: usize, denominator: f64) -> (f64, f64) {
    if denominator > 0.0 {
        (loss / denominator, correct as f64 / denominator)
    } else {
        (0.0, 0.0)
    }
}

// ─── Normalization ────────────────────────────────────────────────────────────
/// Split size plus the settings that shape its denominator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub split_size: usize,
    pub workers:    usize,
    pub mode:       MetricDenominator,
}

impl Normalization {
    pub fn new(split_size: usize, settings: &LstmSettings) -> Self {
        Self {
            split_size,
            workers: settings.data_loader_workers.max(1),
            mode:    settings.metric_denominator,
        }
    }

    /// Worker multiplier: 1 unless the worker-scaled mode is selected.
    fn scale(&self) -> f64 {
        match self.mode {
            MetricDenominator::Samples      => 1.0,
            MetricDenominator::WorkerScaled => self.workers as f64,
        }
    }

    pub fn denominator(&self) -> f64 {
        self.split_size as f64 * self.scale()
    }
}

// ─── ReportCadence ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportCadence {
    interval:      usize,
    batch_size:    usize,
    normalization: Normalization,
}

impl ReportCadence {
    /// A report every `round(split_size / density / batch_size)` batches
    /// (times the worker count in worker-scaled mode), at least every batch.
    pub fn new(normalization: Normalization, report_density: usize, batch_size: usize) -> Self {
        let raw = normalization.split_size as f64
            / report_density.max(1) as f64
            / batch_size.max(1) as f64
            * normalization.scale();

        Self {
            interval: (raw.round() as usize).max(1),
            batch_size: batch_size.max(1),
            normalization,
        }
    }

    pub fn interval(&self) -> usize { self.interval }

    pub fn is_due(&self, batches: usize) -> bool {
        batches > 0 && batches % self.interval == 0
    }

    /// How far through the split `batches` nominal batches are.
    pub fn percent_complete(&self, batches: usize) -> ProgressPercent {
        let split = self.normalization.split_size.max(1) as f64;
        let raw   = 100.0 * (batches * self.batch_size) as f64 / split / self.normalization.scale();

        match self.normalization.mode {
            MetricDenominator::Samples      => ProgressPercent::from_percent(raw.min(100.0)),
            MetricDenominator::WorkerScaled => ProgressPercent::from_percent(raw),
        }
    }
}
