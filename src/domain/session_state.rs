// ============================================================
// Layer 3 — Training Session State
// ============================================================
// The durable record of a training run's progress:
//
//   trained_epochs                  → monotonic epoch counter
//   train_/validation_ losses/accs  → one entry per finished epoch
//   test_loss / test_accuracy       → set by the last evaluation
//   trailing_training_accuracies    → epoch → (percent → accuracy)
//
// The training loop appends to the histories once per epoch and
// the trailing recorder inserts points while an epoch is running.
// Nothing is ever removed. The whole struct is written into every
// checkpoint and restored verbatim on load.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ─── ProgressPercent ──────────────────────────────────────────────────────────
/// A progress percentage with one decimal place, e.g. `12.5`.
///
/// Stored as tenths of a percent so it can be a total-ordered map
/// key. Serialised as its decimal string so it reads naturally in
/// JSON object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgressPercent(u32);

impl ProgressPercent {
    /// Round a percentage to one decimal place. Negative input clamps to 0.
    pub fn from_percent(percent: f64) -> Self {
        Self((percent * 10.0).round().max(0.0) as u32)
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for ProgressPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.as_f64())
    }
}

impl Serialize for ProgressPercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProgressPercent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<f64>()
            .map(Self::from_percent)
            .map_err(|e| de::Error::custom(format!("invalid progress percent '{raw}': {e}")))
    }
}

// ─── TrailingAccuracy ─────────────────────────────────────────────────────────
/// Running training accuracy sampled at fixed progress points,
/// grouped by the (1-based) epoch being trained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrailingAccuracy(BTreeMap<usize, BTreeMap<ProgressPercent, f64>>);

impl TrailingAccuracy {
    /// Record `accuracy` for `epoch` at `percent`. The epoch entry is
    /// created on first use; a repeated percent overwrites.
    pub fn record(&mut self, epoch: usize, percent: ProgressPercent, accuracy: f64) {
        self.0.entry(epoch).or_default().insert(percent, accuracy);
    }

    pub fn epoch(&self, epoch: usize) -> Option<&BTreeMap<ProgressPercent, f64>> {
        self.0.get(&epoch)
    }
}

// ─── SessionState ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub trained_epochs:        usize,
    pub train_losses:          Vec<f64>,
    pub train_accuracies:      Vec<f64>,
    pub validation_losses:     Vec<f64>,
    pub validation_accuracies: Vec<f64>,
    pub test_loss:             Option<f64>,
    pub test_accuracy:         Option<f64>,
    pub trailing_training_accuracies: TrailingAccuracy,
}

impl SessionState {
    /// Append one finished epoch to the four histories.
    pub fn push_epoch(&mut self, train: (f64, f64), validation: (f64, f64)) {
        self.train_losses.push(train.0);
        self.train_accuracies.push(train.1);
        self.validation_losses.push(validation.0);
        self.validation_accuracies.push(validation.1);
    }

    /// Store a test result, replacing any earlier one.
    pub fn set_test(&mut self, loss: f64, accuracy: f64) {
        self.test_loss     = Some(loss);
        self.test_accuracy = Some(accuracy);
    }
}
