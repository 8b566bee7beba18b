// ============================================================
// Layer 5 — Training Session
// ============================================================
// Owns everything one training run needs:
//
//   settings + info    → how the run was configured
//   state              → epoch counter, histories, trailing accuracy
//   model              → LstmClassifier on the autodiff backend
//   loaders            → train (autodiff), validation/test (inner)
//
// and drives the epoch state machine:
//
//   Training ──(split consumed, trained_epochs += 1)──▶ Validating
//   Validating ──(histories appended, checkpoint saved)──▶ Training | Done
//
// The session is the only owner of the model and the state while it
// runs. The checkpoint manager borrows it read-only to save, and
// builds a new one to load.
//
// Reference: Burn Book §5 (Custom Training Loop)

use anyhow::{ensure, Context, Result};
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::AdamConfig,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{fmt, path::PathBuf, sync::Arc};

use crate::data::{
    batcher::{SampleBatch, SampleBatcher},
    dataset::SampleDataset,
    embeddings::WordVectorFile,
};
use crate::domain::{
    embedding::EmbeddingTable,
    session_state::SessionState,
    settings::{DatasetInfo, LstmSettings, Settings},
    traits::EmbeddingProvider,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    accumulator::{MetricAccumulator, Normalization, ReportCadence},
    evaluator::inference_pass,
    model::{LstmClassifier, LstmClassifierConfig, LstmClassifierRecord, MODEL_KIND},
    trainer::{train_epoch, EpochContext, Phase},
};

type Loader<B> = Arc<dyn DataLoader<SampleBatch<B>>>;

/// Number of samples in each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSizes {
    pub train:      usize,
    pub validation: usize,
    pub test:       usize,
}

pub struct TrainingSession<B: AutodiffBackend> {
    settings: Settings,
    info:     DatasetInfo,
    state:    SessionState,
    model:    LstmClassifier<B>,

    train_loader: Loader<B>,
    val_loader:   Loader<B::InnerBackend>,
    test_loader:  Loader<B::InnerBackend>,
    sizes:        SplitSizes,

    span: tracing::Span,
}

impl<B: AutodiffBackend> TrainingSession<B> {
    /// Build a fresh session: read the three splits, resolve the word
    /// vectors and construct the model on `device`.
    ///
    /// Embeddings:
    ///   - `Some(table)`          → used as given
    ///   - `None`, load enabled   → read from `info.embeddings_file`
    ///   - `None`, load disabled  → zero table (the caller is about to
    ///                              overwrite the weights anyway)
    pub fn new(
        settings:        Settings,
        info:            DatasetInfo,
        embeddings:      Option<EmbeddingTable>,
        load_embeddings: bool,
        device:          &B::Device,
    ) -> Result<Self> {
        let span = tracing::info_span!("session", kind = MODEL_KIND);
        let _guard = span.enter();
        tracing::info!("Initializing {} training session", MODEL_KIND);

        settings.validate()?;
        let m = settings.lstm();
        if let Some(seed) = m.seed {
            B::seed(seed);
        }

        tracing::info!("Creating data sets");
        let read = |path: &PathBuf, split: &str| {
            SampleDataset::from_file(
                path,
                settings.padding,
                settings.categories,
                settings.embedding_rows(),
            )
            .with_context(|| format!("Cannot load the {split} split"))
        };
        let train = read(&info.processed_train_file, "training")?;
        let val   = read(&info.processed_val_file, "validation")?;
        let test  = read(&info.processed_test_file, "test")?;
        ensure!(train.sample_count() > 0, "training split is empty");
        ensure!(val.sample_count() > 0, "validation split is empty");

        let sizes = SplitSizes {
            train:      train.sample_count(),
            validation: val.sample_count(),
            test:       test.sample_count(),
        };
        tracing::info!(
            "Splits: {} train, {} validation, {} test",
            sizes.train,
            sizes.validation,
            sizes.test
        );

        tracing::info!("Creating data loaders");
        let train_loader = build_loader::<B>(train, m, device.clone(), m.seed);
        let val_loader   = build_loader::<B::InnerBackend>(val, m, device.clone(), None);
        let test_loader  = build_loader::<B::InnerBackend>(test, m, device.clone(), None);

        tracing::info!("Creating model");
        let table = resolve_embeddings(&settings, &info, embeddings, load_embeddings)?;
        let model = LstmClassifierConfig::from_settings(&settings)
            .init_with_embeddings::<B>(table, device)?;
        tracing::info!("Model created ({} parameters)", model.num_params());

        drop(_guard);
        Ok(Self {
            settings,
            info,
            state: SessionState::default(),
            model,
            train_loader,
            val_loader,
            test_loader,
            sizes,
            span,
        })
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn info(&self) -> &DatasetInfo { &self.info }

    pub fn state(&self) -> &SessionState { &self.state }

    pub fn model(&self) -> &LstmClassifier<B> { &self.model }

    /// Change the epoch target, e.g. to continue a reloaded run.
    pub fn set_target_epochs(&mut self, epochs: usize) {
        self.settings.lstm_mut().epochs = epochs;
    }

    /// Replace model weights and session state with a checkpoint's.
    pub(crate) fn restore(&mut self, state: SessionState, record: LstmClassifierRecord<B>) {
        self.model = self.model.clone().load_record(record);
        self.state = state;
    }

    /// Train until `trained_epochs` reaches the configured epoch count,
    /// validating and checkpointing after every epoch.
    ///
    /// Returns the checkpoint files written, in order. A session that
    /// has already reached its target returns immediately without
    /// touching a batch.
    pub fn train(
        &mut self,
        checkpoints: &CheckpointManager,
        metrics_log: Option<&MetricsLogger>,
    ) -> Result<Vec<PathBuf>> {
        let span = self.span.clone();
        let _guard = span.enter();

        let m: LstmSettings = self.settings.lstm().clone();
        let target = m.epochs;

        let mut optim = AdamConfig::new().init::<B, LstmClassifier<B>>();

        let train_norm = Normalization::new(self.sizes.train, &m);
        let val_norm   = Normalization::new(self.sizes.validation, &m);
        let cadence    = ReportCadence::new(train_norm, m.report_density, m.batch_size);
        tracing::debug!("Progress report every {} batches", cadence.interval());

        let mut saved = Vec::new();
        let mut phase = Phase::initial(self.state.trained_epochs, target);

        if phase == Phase::Done {
            tracing::info!(
                "Already trained {} of {} epochs, nothing to do",
                self.state.trained_epochs,
                target
            );
        } else {
            tracing::info!("Beginning training ({} -> {} epochs)", self.state.trained_epochs, target);
        }

        loop {
            phase = match phase {
                Phase::Training => {
                    let ctx = EpochContext {
                        epoch:         self.state.trained_epochs + 1,
                        target_epochs: target,
                        learning_rate: m.learning_rate,
                        gradient_clip: m.gradient_clip,
                        cadence,
                    };
                    let (model, train_metrics) = train_epoch(
                        self.model.clone(),
                        &mut optim,
                        self.train_loader.as_ref(),
                        &ctx,
                        &mut self.state.trailing_training_accuracies,
                    )?;
                    self.model = model;
                    self.state.trained_epochs += 1;
                    Phase::Validating(train_metrics)
                }

                Phase::Validating(train_metrics) => {
                    tracing::info!("Evaluating on validation set");
                    let val_metrics = self.validation_pass(&self.val_loader)?;

                    let train = train_metrics.finalize(&train_norm);
                    let val   = val_metrics.finalize(&val_norm);
                    self.state.push_epoch(train, val);

                    let epoch = self.state.trained_epochs;
                    tracing::debug!(
                        "Epoch {}: {} trailing accuracy points",
                        epoch,
                        self.state.trailing_training_accuracies.epoch(epoch).map_or(0, |p| p.len())
                    );
                    println!(
                        "Epoch {:>3}/{} | train_loss={:.6} | train_acc={:.3} | val_loss={:.6} | val_acc={:.3}",
                        epoch, target, train.0, train.1, val.0, val.1,
                    );

                    if let Some(log) = metrics_log {
                        log.log(&EpochMetrics::new(epoch, train, val))?;
                    }

                    saved.push(checkpoints.save(self)?);
                    Phase::after_epoch(epoch, target)
                }

                Phase::Done => break,
            };
        }

        tracing::info!("Training completed");
        Ok(saved)
    }

    /// Evaluate on the test split and store the result, replacing any
    /// earlier one. Returns `(loss, accuracy)`.
    pub fn evaluate(&mut self) -> Result<(f64, f64)> {
        let span = self.span.clone();
        let _guard = span.enter();

        ensure!(self.sizes.test > 0, "test split is empty");
        tracing::info!("Evaluating on test set");

        let metrics = self.validation_pass(&self.test_loader)?;
        tracing::debug!("Test set: {}/{} correct", metrics.correct(), metrics.seen());
        let (loss, accuracy) =
            metrics.finalize(&Normalization::new(self.sizes.test, self.settings.lstm()));
        self.state.set_test(loss, accuracy);

        tracing::info!(
            "Epoch: {}/{} | Test Loss: {:.6} | Test Accuracy: {:.3} | Time: {}",
            self.state.trained_epochs,
            self.settings.lstm().epochs,
            loss,
            accuracy,
            chrono::Local::now().format("%Y-%m-%d %H:%M"),
        );
        Ok((loss, accuracy))
    }

    /// Inference-mode pass. `valid()` hands out a dropout-free copy on
    /// the inner backend for the duration of the pass; the training
    /// model itself never leaves training mode.
    fn validation_pass(&self, loader: &Loader<B::InnerBackend>) -> Result<MetricAccumulator> {
        let model = self.model.valid();
        inference_pass(&model, loader.as_ref())
    }
}

// ─── Summary ──────────────────────────────────────────────────────────────────
impl<B: AutodiffBackend> fmt::Display for TrainingSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = serde_json::to_string(&self.settings).map_err(|_| fmt::Error)?;
        let trailing = serde_json::to_string(&self.state.trailing_training_accuracies)
            .map_err(|_| fmt::Error)?;
        let test_accuracy = match self.state.test_accuracy {
            Some(acc) => acc.to_string(),
            None      => "None".to_string(),
        };

        writeln!(f)?;
        writeln!(f, "###################")?;
        writeln!(f, "{}", MODEL_KIND)?;
        writeln!(f, "Epochs: {}", self.state.trained_epochs)?;
        writeln!(f, "Validation Accuracies: {:?}", self.state.validation_accuracies)?;
        writeln!(f, "Test Accuracy: {}", test_accuracy)?;
        writeln!(f, "Model Parameters: {}", self.model.num_params())?;
        writeln!(f, "###################")?;
        writeln!(f, "Settings: {}", settings)?;
        writeln!(f, "Trailing Training Accuracies: {}", trailing)?;
        writeln!(f, "###################")
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────
/// DataLoader over one split. Worker threads are only spawned for more
/// than one worker; Burn's multi-threaded loader partitions the split
/// between workers, so each worker yields its own final partial batch.
fn build_loader<BB: Backend>(
    dataset:  SampleDataset,
    settings: &LstmSettings,
    device:   BB::Device,
    shuffle:  Option<u64>,
) -> Loader<BB> {
    let mut builder = DataLoaderBuilder::new(SampleBatcher::<BB>::new(device))
        .batch_size(settings.batch_size);
    if let Some(seed) = shuffle {
        builder = builder.shuffle(seed);
    }
    if settings.data_loader_workers > 1 {
        builder = builder.num_workers(settings.data_loader_workers);
    }
    builder.build(dataset)
}

fn resolve_embeddings(
    settings:        &Settings,
    info:            &DatasetInfo,
    embeddings:      Option<EmbeddingTable>,
    load_embeddings: bool,
) -> Result<EmbeddingTable> {
    let rows = settings.embedding_rows();
    let dim  = settings.lstm().embedding_size;

    match (embeddings, load_embeddings) {
        (Some(table), _) => Ok(table),
        (None, true) => {
            let path = info
                .embeddings_file
                .as_ref()
                .context("Embedding loading is enabled but no embeddings_file is configured")?;
            tracing::info!("Embedded vectors not preloaded, loading word embeddings");
            let provider: &dyn EmbeddingProvider = &WordVectorFile::new(path);
            provider.load_table()
        }
        (None, false) => {
            tracing::info!("Embedding loading disabled, using a zero table ({}x{})", rows, dim);
            Ok(EmbeddingTable::zeros(rows, dim))
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::{fs, io::Write, path::Path};

    use crate::domain::settings::tests::tiny_settings;

    pub(crate) type TestBackend = Autodiff<NdArray>;

    /// Write `n` random samples in the on-disk split format.
    pub(crate) fn write_split(path: &Path, n: usize, settings: &Settings, seed: u64) {
        let mut rng  = StdRng::seed_from_u64(seed);
        let mut file = fs::File::create(path).unwrap();
        for _ in 0..n {
            let label: usize = rng.gen_range(0..settings.categories);
            // token ids below `categories` echo the label so the task is learnable
            let mut row = vec![label.to_string(), label.to_string()];
            for _ in 1..settings.padding {
                row.push(rng.gen_range(0..settings.embedding_rows()).to_string());
            }
            writeln!(file, "{}", row.join(",")).unwrap();
        }
    }

    pub(crate) fn write_info(dir: &Path, settings: &Settings, sizes: SplitSizes) -> DatasetInfo {
        let info = DatasetInfo {
            processed_train_file: dir.join("train.txt"),
            processed_val_file:   dir.join("val.txt"),
            processed_test_file:  dir.join("test.txt"),
            embeddings_file:      None,
        };
        write_split(&info.processed_train_file, sizes.train, settings, 1);
        write_split(&info.processed_val_file, sizes.validation, settings, 2);
        write_split(&info.processed_test_file, sizes.test, settings, 3);
        info
    }

    pub(crate) fn new_session(dir: &Path, settings: Settings) -> TrainingSession<TestBackend> {
        let sizes = SplitSizes { train: 100, validation: 30, test: 20 };
        let info  = write_info(dir, &settings, sizes);
        TrainingSession::new(settings, info, None, false, &Default::default()).unwrap()
    }

    #[test]
    fn test_single_epoch_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = new_session(dir.path(), tiny_settings());
        assert_eq!(session.sizes.train, 100);

        let checkpoints = CheckpointManager::new(dir.path().join("checkpoints"));
        let saved = session.train(&checkpoints, None).unwrap();

        let state = session.state();
        assert_eq!(state.trained_epochs, 1);
        assert_eq!(state.train_losses.len(), 1);
        assert_eq!(state.train_accuracies.len(), 1);
        assert_eq!(state.validation_losses.len(), 1);
        assert_eq!(state.validation_accuracies.len(), 1);
        assert!(state.trailing_training_accuracies.epoch(1).is_some());

        assert_eq!(saved.len(), 1);
        assert!(saved[0].is_file());
        let name = saved[0].file_name().unwrap().to_str().unwrap();
        assert!(crate::infra::checkpoint::is_checkpoint_name(name), "bad name {name}");
    }

    #[test]
    fn test_epoch_counter_steps_by_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = tiny_settings();
        settings.lstm_mut().epochs = 3;
        let mut session = new_session(dir.path(), settings);

        let checkpoints = CheckpointManager::new(dir.path().join("checkpoints"));
        let log = MetricsLogger::new(dir.path().join("checkpoints")).unwrap();
        session.train(&checkpoints, Some(&log)).unwrap();

        let state = session.state();
        assert_eq!(state.trained_epochs, 3);
        assert_eq!(state.validation_losses.len(), 3);
        for epoch in 1..=3 {
            assert!(state.trailing_training_accuracies.epoch(epoch).is_some());
        }
        assert!(state.trailing_training_accuracies.epoch(4).is_none());

        let csv = fs::read_to_string(log.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 4);
    }

    #[test]
    fn test_two_loader_workers_complete_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = tiny_settings();
        settings.lstm_mut().data_loader_workers = 2;
        let mut session = new_session(dir.path(), settings);

        let checkpoints = CheckpointManager::new(dir.path().join("checkpoints"));
        let saved = session.train(&checkpoints, None).unwrap();

        let state = session.state();
        assert_eq!(saved.len(), 1);
        assert_eq!(state.trained_epochs, 1);
        assert!(state.train_losses[0].is_finite());
        assert!((0.0..=1.0).contains(&state.train_accuracies[0]));
        assert!((0.0..=1.0).contains(&state.validation_accuracies[0]));
    }

    #[test]
    fn test_reached_target_trains_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = new_session(dir.path(), tiny_settings());
        session.state.trained_epochs = 5;
        session.set_target_epochs(5);

        let checkpoints = CheckpointManager::new(dir.path().join("checkpoints"));
        let saved = session.train(&checkpoints, None).unwrap();

        assert!(saved.is_empty());
        assert_eq!(session.state().trained_epochs, 5);
        assert!(session.state().train_losses.is_empty());
        assert!(session.state().trailing_training_accuracies.epoch(6).is_none());
        assert!(!dir.path().join("checkpoints").exists());
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = new_session(dir.path(), tiny_settings());

        let first  = session.evaluate().unwrap();
        let second = session.evaluate().unwrap();

        assert_eq!(first, second);
        assert_eq!(session.state().test_loss, Some(first.0));
        assert_eq!(session.state().test_accuracy, Some(first.1));
        assert!((0.0..=1.0).contains(&first.1));
    }

    #[test]
    fn test_missing_embeddings_file_is_error_when_loading() {
        let dir      = tempfile::tempdir().unwrap();
        let settings = tiny_settings();
        let sizes    = SplitSizes { train: 10, validation: 10, test: 10 };
        let info     = write_info(dir.path(), &settings, sizes);

        let result = TrainingSession::<TestBackend>::new(settings, info, None, true, &Default::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_embeddings_loaded_from_file() {
        let dir      = tempfile::tempdir().unwrap();
        let settings = tiny_settings();
        let sizes    = SplitSizes { train: 10, validation: 10, test: 10 };
        let mut info = write_info(dir.path(), &settings, sizes);

        let vectors = dir.path().join("vectors.txt");
        let mut file = fs::File::create(&vectors).unwrap();
        for row in 0..settings.embedding_rows() {
            writeln!(file, "{} 0 0 1", row).unwrap();
        }
        info.embeddings_file = Some(vectors);

        let session =
            TrainingSession::<TestBackend>::new(settings, info, None, true, &Default::default()).unwrap();
        let weights: Vec<f32> = session.model().embedding.weight.val().into_data().iter::<f32>().collect();
        assert_eq!(&weights[4..8], &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_training_split_rejected() {
        let dir      = tempfile::tempdir().unwrap();
        let settings = tiny_settings();
        let sizes    = SplitSizes { train: 0, validation: 10, test: 10 };
        let info     = write_info(dir.path(), &settings, sizes);

        assert!(TrainingSession::<TestBackend>::new(settings, info, None, false, &Default::default()).is_err());
    }

    #[test]
    fn test_summary_lists_run_without_device() {
        let dir     = tempfile::tempdir().unwrap();
        let session = new_session(dir.path(), tiny_settings());
        let summary = session.to_string();

        assert!(summary.contains(MODEL_KIND));
        assert!(summary.contains("Epochs: 0"));
        assert!(summary.contains("Test Accuracy: None"));
        assert!(summary.contains(&format!("Model Parameters: {}", session.model().num_params())));
        assert!(!summary.contains("device"));
    }
}
