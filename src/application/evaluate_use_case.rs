// ============================================================
// Layer 2 — Evaluate / Summary Use Cases
// ============================================================
// Both start from a saved checkpoint:
//
//   EvaluateUseCase → reload, run the test split, save the result
//   SummaryUseCase  → reload, describe the run
//
// Reloading re-reads the dataset splits named in the checkpoint,
// so those files must still be where training found them.

use anyhow::Result;
use burn::tensor::backend::AutodiffBackend;
use std::path::PathBuf;

use crate::domain::settings::DeviceKind;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{dispatch, BackendTask},
    session::TrainingSession,
};

// ─── EvaluateUseCase ──────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct EvaluateReport {
    pub checkpoint:    PathBuf,
    pub saved_to:      PathBuf,
    pub test_loss:     f64,
    pub test_accuracy: f64,
}

pub struct EvaluateUseCase {
    /// Checkpoint path or "latest"
    checkpoint:     String,
    checkpoint_dir: PathBuf,
    device:         DeviceKind,
}

impl EvaluateUseCase {
    pub fn new(checkpoint: String, checkpoint_dir: PathBuf, device: DeviceKind) -> Self {
        Self { checkpoint, checkpoint_dir, device }
    }

    pub fn execute(self) -> Result<EvaluateReport> {
        dispatch(self.device, self)
    }
}

impl BackendTask for EvaluateUseCase {
    type Output = EvaluateReport;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<EvaluateReport> {
        let manager    = CheckpointManager::new(&self.checkpoint_dir);
        let checkpoint = manager.resolve(&self.checkpoint)?;

        let mut session: TrainingSession<B> = manager.load(&checkpoint, &device)?;
        let (test_loss, test_accuracy) = session.evaluate()?;
        let saved_to = manager.save(&session)?;

        Ok(EvaluateReport { checkpoint, saved_to, test_loss, test_accuracy })
    }
}

// ─── SummaryUseCase ───────────────────────────────────────────────────────────
pub struct SummaryUseCase {
    checkpoint:     String,
    checkpoint_dir: PathBuf,
}

impl SummaryUseCase {
    pub fn new(checkpoint: String, checkpoint_dir: PathBuf) -> Self {
        Self { checkpoint, checkpoint_dir }
    }

    /// Always reloads on the CPU.
    pub fn execute(self) -> Result<String> {
        dispatch(DeviceKind::Cpu, self)
    }
}

impl BackendTask for SummaryUseCase {
    type Output = String;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<String> {
        let manager = CheckpointManager::new(&self.checkpoint_dir);
        let path    = manager.resolve(&self.checkpoint)?;
        let session: TrainingSession<B> = manager.load(&path, &device)?;
        Ok(session.to_string())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::settings::tests::tiny_settings;
    use crate::ml::session::tests::new_session;

    #[test]
    fn test_evaluate_latest_checkpoint() {
        let dir      = tempfile::tempdir().unwrap();
        let ck_dir   = dir.path().join("checkpoints");
        let mut session = new_session(dir.path(), tiny_settings());
        session.train(&CheckpointManager::new(&ck_dir), None).unwrap();

        let report = EvaluateUseCase::new("latest".into(), ck_dir.clone(), DeviceKind::Cpu)
            .execute()
            .unwrap();
        assert!((0.0..=1.0).contains(&report.test_accuracy));
        assert!(report.saved_to.is_file());

        let summary = SummaryUseCase::new("latest".into(), ck_dir).execute().unwrap();
        assert!(summary.contains("Epochs: 1"));
        assert!(summary.contains(&format!("Test Accuracy: {}", report.test_accuracy)));
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = SummaryUseCase::new("latest".into(), dir.path().to_path_buf());
        assert!(use_case.execute().is_err());
    }
}
