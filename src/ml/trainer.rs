// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One training epoch over Burn's DataLoader with Adam:
//
//   for each batch:
//     reset hidden state (sized to the batch)
//     forward        → log-probabilities [batch, categories]
//     NLL loss       → scalar
//     backward       → gradients
//     clip           → global L2 norm capped at gradient_clip
//     step           → Adam update
//     accumulate     → MetricAccumulator
//     at cadence     → progress log + trailing accuracy point
//
// The epoch-level state machine (Training → Validating → Done)
// lives in TrainingSession; this module holds the per-epoch work
// and the Phase type the session steps through.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{ensure, Result};
use burn::{
    data::dataloader::DataLoader,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::SampleBatch;
use crate::domain::session_state::TrailingAccuracy;
use crate::ml::accumulator::{MetricAccumulator, ReportCadence};
use crate::ml::gradients::clip_grad_norm;
use crate::ml::model::{int_values, nll_loss, predicted_categories, SequenceClassifier};

// ─── Phase ────────────────────────────────────────────────────────────────────
/// Where the epoch loop stands. `Validating` carries the finished
/// epoch's training sums until validation has run.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Training,
    Validating(MetricAccumulator),
    Done,
}

impl Phase {
    pub fn initial(trained_epochs: usize, target_epochs: usize) -> Self {
        Self::after_epoch(trained_epochs, target_epochs)
    }

    /// Next phase once an epoch has been validated.
    pub fn after_epoch(trained_epochs: usize, target_epochs: usize) -> Self {
        if trained_epochs < target_epochs {
            Phase::Training
        } else {
            Phase::Done
        }
    }
}

// ─── EpochContext ─────────────────────────────────────────────────────────────
/// Per-epoch constants handed to `train_epoch`.
#[derive(Debug, Clone, Copy)]
pub struct EpochContext {
    /// 1-based number of the epoch being trained
    pub epoch:         usize,
    pub target_epochs: usize,
    pub learning_rate: f64,
    /// Ceiling on the global gradient norm
    pub gradient_clip: f64,
    pub cadence:       ReportCadence,
}

/// Run one pass over the training split and return the updated model
/// with the epoch's running sums.
///
/// A non-finite batch loss aborts the epoch with an error; nothing is
/// retried.
pub fn train_epoch<B, M, O>(
    mut model: M,
    optim:     &mut O,
    loader:    &dyn DataLoader<SampleBatch<B>>,
    ctx:       &EpochContext,
    trailing:  &mut TrailingAccuracy,
) -> Result<(M, MetricAccumulator)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SequenceClassifier<B>,
    O: Optimizer<M, B>,
{
    let mut metrics = MetricAccumulator::new();

    for batch in loader.iter() {
        let batch_len = batch.len();
        let device    = batch.tokens.device();

        let hidden    = model.init_hidden(batch_len, &device);
        let log_probs = model.forward(batch.tokens, hidden);
        let loss      = nll_loss(log_probs.clone(), batch.labels.clone());

        let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();
        ensure!(
            loss_value.is_finite(),
            "non-finite training loss ({}) in epoch {} at batch {}",
            loss_value,
            ctx.epoch,
            metrics.batches() + 1
        );

        let predictions = predicted_categories(log_probs);
        let labels      = int_values(batch.labels);

        // Backward pass, global-norm clip, Adam update
        let grads     = loss.backward();
        let mut grads = GradientsParams::from_grads(grads, &model);
        let norm      = clip_grad_norm::<B, M>(&model, &mut grads, ctx.gradient_clip);
        if norm > ctx.gradient_clip {
            tracing::trace!(
                "batch {}: gradient norm {:.4} clipped to {}",
                metrics.batches() + 1,
                norm,
                ctx.gradient_clip
            );
        }
        model = optim.step(ctx.learning_rate, model, grads);

        // The loss is a batch mean; the accumulator wants the sum.
        metrics.add(loss_value * batch_len as f64, &predictions, &labels);

        if ctx.cadence.is_due(metrics.batches()) {
            report_progress(ctx, &metrics, trailing);
        }
    }

    Ok((model, metrics))
}

/// Log running metrics and store the trailing accuracy point.
fn report_progress(ctx: &EpochContext, metrics: &MetricAccumulator, trailing: &mut TrailingAccuracy) {
    let (loss, accuracy) = metrics.snapshot();
    let percent          = ctx.cadence.percent_complete(metrics.batches());

    tracing::info!(
        "Epoch: {}/{} - {}% | Training Loss: {:.6} | Training Accuracy: {:.3} | Time: {}",
        ctx.epoch,
        ctx.target_epochs,
        percent,
        loss,
        accuracy,
        chrono::Local::now().format("%Y-%m-%d %H:%M"),
    );

    trailing.record(ctx.epoch, percent, accuracy);
}
