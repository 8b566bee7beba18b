// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `summary`, and their flags.
//
// Hyperparameters live in the settings file, not on the command
// line; the flags here only choose what to run and where.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainRequest;
use crate::domain::settings::DeviceKind;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a model from a settings file, or resume a checkpoint
    Train(TrainArgs),

    /// Evaluate a checkpoint on its test split
    Evaluate(EvaluateArgs),

    /// Print a summary of a checkpoint
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON settings file ({"settings": ..., "info": ...})
    #[arg(long, required_unless_present = "resume")]
    pub config: Option<PathBuf>,

    /// Checkpoint to continue from, or "latest"
    #[arg(long)]
    pub resume: Option<String>,

    /// Train until this many epochs are done (overrides the settings)
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Directory for checkpoints and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Compute device (defaults to the settings file, then cpu)
    #[arg(long, value_enum)]
    pub device: Option<DeviceKind>,

    /// Start from a zero embedding table instead of the word vector file
    #[arg(long)]
    pub no_embeddings: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainRequest.
impl From<TrainArgs> for TrainRequest {
    fn from(a: TrainArgs) -> Self {
        TrainRequest {
            config:          a.config,
            resume:          a.resume,
            epochs:          a.epochs,
            checkpoint_dir:  a.checkpoint_dir,
            device:          a.device,
            load_embeddings: !a.no_embeddings,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Checkpoint file, or "latest"
    #[arg(long, default_value = "latest")]
    pub checkpoint: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = DeviceKind::Cpu)]
    pub device: DeviceKind,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Checkpoint file, or "latest"
    #[arg(long, default_value = "latest")]
    pub checkpoint: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,
}
