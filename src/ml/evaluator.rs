// ============================================================
// Layer 5 — Inference Pass (validation / test)
// ============================================================
// Forward-only pass over a held-out split: no backward pass, no
// optimiser step. Callers hand in the model obtained from
// `AutodiffModule::valid()`, which lives on the inner backend,
// so dropout is off and no autodiff graph is recorded.
//
// Reference: Burn Book §5 (valid() and the inner backend)

use anyhow::{ensure, Result};
use burn::{data::dataloader::DataLoader, prelude::*};

use crate::data::batcher::SampleBatch;
use crate::ml::accumulator::MetricAccumulator;
use crate::ml::model::{int_values, nll_loss, predicted_categories, SequenceClassifier};

pub fn inference_pass<B, M>(
    model:  &M,
    loader: &dyn DataLoader<SampleBatch<B>>,
) -> Result<MetricAccumulator>
where
    B: Backend,
    M: SequenceClassifier<B>,
{
    let mut metrics = MetricAccumulator::new();

    for batch in loader.iter() {
        let batch_len = batch.len();
        let hidden    = model.init_hidden(batch_len, &batch.tokens.device());
        let log_probs = model.forward(batch.tokens, hidden);

        let loss_value: f64 = nll_loss(log_probs.clone(), batch.labels.clone())
            .into_scalar()
            .elem::<f64>();
        ensure!(
            loss_value.is_finite(),
            "non-finite evaluation loss ({}) at batch {}",
            loss_value,
            metrics.batches() + 1
        );

        metrics.add(
            loss_value * batch_len as f64,
            &predicted_categories(log_probs),
            &int_values(batch.labels),
        );
    }

    Ok(metrics)
}
