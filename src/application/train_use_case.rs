// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Read the settings file        (Layer 6 - infra)
//   Step 2: Build or resume the session   (Layer 5 - ml / Layer 6)
//   Step 3: Apply the epoch override
//   Step 4: Train, one checkpoint/epoch   (Layer 5 - ml)
//   Step 5: Evaluate on the test split    (Layer 5 - ml)
//   Step 6: Save the evaluated session    (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use std::path::PathBuf;

use crate::domain::settings::{DeviceKind, RunConfig};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    settings_store::load_run_config,
};
use crate::ml::{
    backend::{dispatch, BackendTask},
    session::TrainingSession,
};

// ─── Training Request ─────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TrainRequest {
    /// Settings file; may be omitted when resuming
    pub config:          Option<PathBuf>,
    /// Checkpoint path or "latest"
    pub resume:          Option<String>,
    pub epochs:          Option<usize>,
    pub checkpoint_dir:  PathBuf,
    /// Overrides the device from the settings file
    pub device:          Option<DeviceKind>,
    pub load_embeddings: bool,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub checkpoints:   Vec<PathBuf>,
    pub final_path:    PathBuf,
    pub test_loss:     f64,
    pub test_accuracy: f64,
    pub summary:       String,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    request: TrainRequest,
}

impl TrainUseCase {
    pub fn new(request: TrainRequest) -> Self {
        Self { request }
    }

    pub fn execute(self) -> Result<TrainReport> {
        // ── Step 1: Settings file ─────────────────────────────────────────────
        let config = match &self.request.config {
            Some(path) => Some(load_run_config(path)?),
            None       => None,
        };
        let device = self
            .request
            .device
            .or(config.as_ref().map(|c| c.settings.device))
            .unwrap_or_default();

        dispatch(device, TrainTask { request: self.request, config })
    }
}

struct TrainTask {
    request: TrainRequest,
    config:  Option<RunConfig>,
}

impl BackendTask for TrainTask {
    type Output = TrainReport;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<TrainReport> {
        let req     = self.request;
        let manager = CheckpointManager::new(&req.checkpoint_dir);

        // ── Step 2: Fresh session or resumed checkpoint ───────────────────────
        let mut session: TrainingSession<B> = match (&req.resume, self.config) {
            (Some(name), _) => {
                let path = manager.resolve(name)?;
                manager.load(&path, &device)?
            }
            (None, Some(config)) => TrainingSession::new(
                config.settings,
                config.info,
                None,
                req.load_embeddings,
                &device,
            )?,
            (None, None) => anyhow::bail!("Either a settings file or a checkpoint to resume is required"),
        };

        // ── Step 3: Epoch target ──────────────────────────────────────────────
        if let Some(epochs) = req.epochs {
            tracing::info!("Training target set to {} epochs", epochs);
            session.set_target_epochs(epochs);
        }

        // ── Step 4: Train ─────────────────────────────────────────────────────
        let metrics_log = MetricsLogger::new(manager.dir())?;
        tracing::info!("Epoch metrics go to '{}'", metrics_log.csv_path().display());
        let checkpoints = session.train(&manager, Some(&metrics_log))?;

        // ── Step 5: Test split ────────────────────────────────────────────────
        let (test_loss, test_accuracy) = session.evaluate()?;

        // ── Step 6: Persist the test result with the weights ──────────────────
        let final_path = manager
            .save(&session)
            .context("Failed to save the evaluated session")?;

        Ok(TrainReport {
            checkpoints,
            final_path,
            test_loss,
            test_accuracy,
            summary: session.to_string(),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use crate::domain::settings::tests::tiny_settings;
    use crate::ml::session::{tests::write_info, SplitSizes};

    fn request(dir: &std::path::Path) -> TrainRequest {
        let sizes = SplitSizes { train: 40, validation: 20, test: 20 };
        let info  = write_info(dir, &tiny_settings(), sizes);
        let path  = dir.join("run.json");
        let run   = RunConfig { settings: tiny_settings(), info };
        fs::write(&path, serde_json::to_string(&run).unwrap()).unwrap();

        TrainRequest {
            config:          Some(path),
            resume:          None,
            epochs:          None,
            checkpoint_dir:  dir.join("checkpoints"),
            device:          Some(DeviceKind::Cpu),
            load_embeddings: false,
        }
    }

    #[test]
    fn test_fresh_run_trains_evaluates_and_saves() {
        let dir    = tempfile::tempdir().unwrap();
        let report = TrainUseCase::new(request(dir.path())).execute().unwrap();

        assert_eq!(report.checkpoints.len(), 1);
        assert!(report.final_path.is_file());
        assert!((0.0..=1.0).contains(&report.test_accuracy));
        assert!(report.summary.contains("Epochs: 1"));
        assert!(dir.path().join("checkpoints/metrics.csv").is_file());
    }

    #[test]
    fn test_resume_continues_to_new_target() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path());
        TrainUseCase::new(req.clone()).execute().unwrap();

        let resumed = TrainRequest {
            config: None,
            resume: Some("latest".to_string()),
            epochs: Some(2),
            ..req
        };
        let report = TrainUseCase::new(resumed).execute().unwrap();

        // Only the second epoch is trained
        assert_eq!(report.checkpoints.len(), 1);
        assert!(report.summary.contains("Epochs: 2"));
    }

    #[test]
    fn test_nothing_to_start_from_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let req = TrainRequest { config: None, ..request(dir.path()) };
        assert!(TrainUseCase::new(req).execute().is_err());
    }
}
