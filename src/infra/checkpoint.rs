// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores whole training sessions with Burn's named
// MessagePack + gzip recorder at full precision.
//
// One file per checkpoint, holding everything needed to pick a
// run back up:
//   1. session  — settings, dataset info and session state as JSON
//   2. model    — the LstmClassifier record (all parameters)
//
// File naming convention (local wall-clock time):
//   checkpoints/
//     2024-03-07_14-05_LstmWord2Vec.mpk.gz
//     2024-03-07_14-09_LstmWord2Vec.mpk.gz
//     metrics.csv
//
// Two saves within the same minute write the same file; the later
// one wins.
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    module::Module,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Record, Recorder},
    tensor::backend::AutodiffBackend,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::domain::{
    session_state::SessionState,
    settings::{DatasetInfo, Settings},
};
use crate::ml::{
    model::{LstmClassifierRecord, MODEL_KIND},
    session::TrainingSession,
};

const EXTENSION: &str = ".mpk.gz";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";
const TIMESTAMP_LEN: usize = 16;

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Everything in a checkpoint except the weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CheckpointMeta {
    settings: Settings,
    info:     DatasetInfo,
    state:    SessionState,
}

/// On-disk bundle: the JSON metadata next to the model record.
#[derive(Record)]
struct CheckpointRecord<B: Backend> {
    session: String,
    model:   LstmClassifierRecord<B>,
}

/// Writes and reads checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// The directory is only created on the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the whole session and return the file written.
    pub fn save<B: AutodiffBackend>(&self, session: &TrainingSession<B>) -> Result<PathBuf> {
        match fs::create_dir(&self.dir) {
            Ok(()) => tracing::debug!("Created checkpoint directory '{}'", self.dir.display()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                tracing::info!("Checkpoint directory '{}' already exists", self.dir.display())
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Cannot create checkpoint directory '{}'", self.dir.display())
                })
            }
        }

        let stem = checkpoint_stem(chrono::Local::now().naive_local(), MODEL_KIND);
        let path = self.dir.join(format!("{stem}{EXTENSION}"));

        let meta = CheckpointMeta {
            settings: session.settings().clone(),
            info:     session.info().clone(),
            state:    session.state().clone(),
        };
        let record = CheckpointRecord {
            session: serde_json::to_string(&meta)?,
            model:   session.model().clone().into_record(),
        };

        CheckpointRecorder::new()
            .record(record, self.dir.join(&stem))
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::info!(
            "Saved checkpoint '{}' (epoch {})",
            path.display(),
            session.state().trained_epochs
        );
        Ok(path)
    }

    /// Rebuild a session from a checkpoint file.
    ///
    /// The datasets are re-read from the stored `info`; the embedding
    /// table is not, since the stored weights replace it. Any failure
    /// (missing file, truncated file, bad metadata) fails the whole load.
    pub fn load<B: AutodiffBackend>(
        &self,
        path:   impl AsRef<Path>,
        device: &B::Device,
    ) -> Result<TrainingSession<B>> {
        let path = path.as_ref();
        tracing::info!("Loading checkpoint '{}'", path.display());

        let record: CheckpointRecord<B> = CheckpointRecorder::new()
            .load(record_stem(path), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        let meta: CheckpointMeta = serde_json::from_str(&record.session)
            .with_context(|| format!("Corrupt session data in '{}'", path.display()))?;

        let mut session = TrainingSession::new(meta.settings, meta.info, None, false, device)
            .with_context(|| format!("Cannot rebuild session from '{}'", path.display()))?;
        session.restore(meta.state, record.model);

        tracing::info!(
            "Restored {} session at epoch {}",
            MODEL_KIND,
            session.state().trained_epochs
        );
        Ok(session)
    }

    /// `"latest"` → newest checkpoint in the directory, anything else
    /// is taken as a file path.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name == "latest" {
            self.latest()?
                .with_context(|| format!("No checkpoint found in '{}'", self.dir.display()))
        } else {
            Ok(PathBuf::from(name))
        }
    }

    /// Most recent checkpoint in the directory, by file name.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Cannot list '{}'", self.dir.display()))
            }
        };

        let mut newest: Option<String> = None;
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if is_checkpoint_name(&name) && newest.as_ref().map_or(true, |n| name > *n) {
                newest = Some(name);
            }
        }
        Ok(newest.map(|name| self.dir.join(name)))
    }
}

// ─── Naming ───────────────────────────────────────────────────────────────────
/// `<YYYY>-<MM>-<DD>_<HH>-<MM>_<kind>`, without the extension.
pub fn checkpoint_stem(time: NaiveDateTime, kind: &str) -> String {
    format!("{}_{}", time.format(TIMESTAMP_FORMAT), kind)
}

/// True for `YYYY-MM-DD_HH-MM_<kind>.mpk.gz`.
pub fn is_checkpoint_name(name: &str) -> bool {
    let Some(stem) = name.strip_suffix(EXTENSION) else {
        return false;
    };
    let (Some(stamp), Some(rest)) = (stem.get(..TIMESTAMP_LEN), stem.get(TIMESTAMP_LEN..)) else {
        return false;
    };
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok()
        && rest.len() > 1
        && rest.starts_with('_')
}

/// The file recorder appends its own extension, so hand it the bare stem.
fn record_stem(path: &Path) -> PathBuf {
    match path.to_str().and_then(|p| p.strip_suffix(EXTENSION)) {
        Some(stem) => PathBuf::from(stem),
        None       => path.to_path_buf(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::domain::settings::tests::tiny_settings;
    use crate::ml::session::tests::{new_session, TestBackend};

    fn weights(session: &TrainingSession<TestBackend>) -> Vec<f32> {
        let model = session.model();
        let mut values = model.embedding.weight.val().into_data().to_vec::<f32>().unwrap();
        values.extend(model.output.weight.val().into_data().to_vec::<f32>().unwrap());
        values
    }

    #[test]
    fn test_checkpoint_stem_format() {
        let time = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 59)
            .unwrap();
        assert_eq!(checkpoint_stem(time, "LstmWord2Vec"), "2024-03-07_09-05_LstmWord2Vec");
    }

    #[test]
    fn test_checkpoint_name_recognition() {
        assert!(is_checkpoint_name("2024-03-07_09-05_LstmWord2Vec.mpk.gz"));
        assert!(!is_checkpoint_name("2024-03-07_09-05_LstmWord2Vec.json"));
        assert!(!is_checkpoint_name("2024-03-07_09-05_.mpk.gz"));
        assert!(!is_checkpoint_name("metrics.csv"));
        assert!(!is_checkpoint_name("model_epoch_1.mpk.gz"));
        assert!(!is_checkpoint_name("2024-13-40_99-99_LstmWord2Vec.mpk.gz"));
    }

    #[test]
    fn test_record_stem_strips_extension() {
        assert_eq!(
            record_stem(Path::new("ck/2024-03-07_09-05_LstmWord2Vec.mpk.gz")),
            PathBuf::from("ck/2024-03-07_09-05_LstmWord2Vec")
        );
        assert_eq!(record_stem(Path::new("ck/other")), PathBuf::from("ck/other"));
    }

    #[test]
    fn test_round_trip_restores_state_and_weights() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = new_session(dir.path(), tiny_settings());
        let manager = CheckpointManager::new(dir.path().join("checkpoints"));

        session.train(&manager, None).unwrap();
        session.evaluate().unwrap();
        let path = manager.save(&session).unwrap();

        let loaded: TrainingSession<TestBackend> =
            manager.load(&path, &Default::default()).unwrap();

        assert_eq!(loaded.state(), session.state());
        assert_eq!(loaded.settings(), session.settings());
        assert_eq!(loaded.info(), session.info());
        assert_eq!(loaded.model().num_params(), session.model().num_params());
        assert_eq!(weights(&loaded), weights(&session));
    }

    #[test]
    fn test_reloaded_finished_run_trains_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = new_session(dir.path(), tiny_settings());
        let manager = CheckpointManager::new(dir.path().join("checkpoints"));

        let mut state = session.state().clone();
        state.trained_epochs = 5;
        let record = session.model().clone().into_record();
        session.restore(state, record);
        let path = manager.save(&session).unwrap();

        let mut loaded: TrainingSession<TestBackend> =
            manager.load(&path, &Default::default()).unwrap();
        loaded.set_target_epochs(5);

        assert!(loaded.train(&manager, None).unwrap().is_empty());
        assert_eq!(loaded.state().trained_epochs, 5);
        assert!(loaded.state().train_losses.is_empty());
    }

    #[test]
    fn test_existing_directory_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let session = new_session(dir.path(), tiny_settings());
        let manager = CheckpointManager::new(dir.path().join("checkpoints"));
        fs::create_dir(manager.dir()).unwrap();

        let path = manager.save(&session).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_truncated_checkpoint_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = new_session(dir.path(), tiny_settings());
        let manager = CheckpointManager::new(dir.path().join("checkpoints"));
        let path = manager.save(&session).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        let result: Result<TrainingSession<TestBackend>> = manager.load(&path, &Default::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_checkpoint_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let result: Result<TrainingSession<TestBackend>> =
            manager.load(dir.path().join("nope.mpk.gz"), &Default::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_latest_picks_newest_name() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("checkpoints"));
        assert_eq!(manager.latest().unwrap(), None);

        fs::create_dir(manager.dir()).unwrap();
        for name in [
            "2024-03-07_09-05_LstmWord2Vec.mpk.gz",
            "2024-11-01_00-00_LstmWord2Vec.mpk.gz",
            "2024-03-08_23-59_LstmWord2Vec.mpk.gz",
            "metrics.csv",
        ] {
            fs::write(manager.dir().join(name), b"").unwrap();
        }

        assert_eq!(
            manager.latest().unwrap(),
            Some(manager.dir().join("2024-11-01_00-00_LstmWord2Vec.mpk.gz"))
        );
        assert_eq!(
            manager.resolve("latest").unwrap(),
            manager.dir().join("2024-11-01_00-00_LstmWord2Vec.mpk.gz")
        );
        assert_eq!(manager.resolve("some/file.mpk.gz").unwrap(), PathBuf::from("some/file.mpk.gz"));
    }

    #[test]
    fn test_resolve_latest_in_empty_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CheckpointManager::new(dir.path()).resolve("latest").is_err());
    }
}
