// ============================================================
// Layer 4 — Sample Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<Sample>
// into two aligned tensors.
//
// How batching works here:
//   Input:  Vec of N Samples, each with W token ids
//   Output: SampleBatch with
//             labels: [N]
//             tokens: [N, W]
//
//   We flatten all token ids into one long Vec, then reshape:
//   [s1_t1, s1_t2, ..., s1_tW, s2_t1, ..., sN_tW] → [N, W]
//
// Row i of `tokens` always belongs to labels[i]; nothing is
// reordered or dropped. Every sample is already padded to the
// same width by the dataset loader, so no padding happens here.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::Sample;

// ─── SampleBatch ──────────────────────────────────────────────────────────────
/// A batch of samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct SampleBatch<B: Backend> {
    /// Category ids — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,

    /// Token ids — shape: [batch_size, padding]
    pub tokens: Tensor<B, 2, Int>,
}

impl<B: Backend> SampleBatch<B> {
    pub fn len(&self) -> usize {
        self.labels.dims()[0]
    }
}

// ─── SampleBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the
/// model lives.
#[derive(Clone, Debug)]
pub struct SampleBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SampleBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<Sample, SampleBatch<B>> for SampleBatcher<B> {
    fn batch(&self, items: Vec<Sample>) -> SampleBatch<B> {
        let batch_size = items.len();
        let width      = items.first().map(Sample::width).unwrap_or(0);
        debug_assert!(items.iter().all(|s| s.width() == width), "ragged batch");

        let labels: Vec<i64> = items
            .iter()
            .map(|s| s.label as i64)
            .collect();

        let tokens_flat: Vec<i64> = items
            .iter()
            .flat_map(|s| s.tokens.iter().map(|&t| t as i64))
            .collect();

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        let tokens = Tensor::<B, 1, Int>::from_ints(tokens_flat.as_slice(), &self.device)
            .reshape([batch_size, width]);

        SampleBatch { labels, tokens }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn to_vec<const D: usize>(t: Tensor<TestBackend, D, Int>) -> Vec<i64> {
        t.into_data().iter::<i64>().collect()
    }

    #[test]
    fn test_shapes_follow_input() {
        let batcher = SampleBatcher::<TestBackend>::new(Default::default());

        for n in [1usize, 3, 10] {
            let items: Vec<Sample> = (0..n)
                .map(|i| Sample::new(i % 2, vec![i as u32; 4]))
                .collect();
            let batch = batcher.batch(items);

            assert_eq!(batch.labels.dims(), [n]);
            assert_eq!(batch.tokens.dims(), [n, 4]);
            assert_eq!(batch.len(), n);
        }
    }

    #[test]
    fn test_rows_stay_aligned_with_labels() {
        let batcher = SampleBatcher::<TestBackend>::new(Default::default());
        let items = vec![
            Sample::new(2, vec![20, 21, 22]),
            Sample::new(0, vec![0, 1, 2]),
            Sample::new(1, vec![10, 11, 12]),
        ];

        let batch  = batcher.batch(items);
        let labels = to_vec(batch.labels);
        let tokens = to_vec(batch.tokens);

        assert_eq!(labels, vec![2, 0, 1]);
        for (i, &label) in labels.iter().enumerate() {
            // every token in row i was built as label * 10 + position
            let row = &tokens[i * 3..(i + 1) * 3];
            assert_eq!(row, &[label * 10, label * 10 + 1, label * 10 + 2]);
        }
    }
}
