// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// `clap` and delegates the work to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — train from a settings file or resume a checkpoint
//   2. `evaluate` — test-split metrics for a checkpoint
//   3. `summary`  — print what a checkpoint contains
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, SummaryArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "lstm-text-classifier",
    version,
    about = "Train, evaluate and checkpoint an LSTM text classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Summary(args)  => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let report = TrainUseCase::new(args.into()).execute()?;

    println!("{}", report.summary);
    println!(
        "Test loss: {:.6} | Test accuracy: {:.3}",
        report.test_loss, report.test_accuracy
    );
    for path in &report.checkpoints {
        println!("Checkpoint: {}", path.display());
    }
    println!("Final checkpoint: {}", report.final_path.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.checkpoint, args.checkpoint_dir, args.device).execute()?;

    println!("Checkpoint: {}", report.checkpoint.display());
    println!(
        "Test loss: {:.6} | Test accuracy: {:.3}",
        report.test_loss, report.test_accuracy
    );
    println!("Saved with test results: {}", report.saved_to.display());
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    use crate::application::evaluate_use_case::SummaryUseCase;

    let summary = SummaryUseCase::new(args.checkpoint, args.checkpoint_dir).execute()?;
    println!("{summary}");
    Ok(())
}
