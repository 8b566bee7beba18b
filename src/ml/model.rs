// ============================================================
// Layer 5 — LSTM Text Classifier
// ============================================================
// Word-embedding lookup → stacked LSTM → last time step →
// dropout → linear → log-softmax over categories.
//
//   tokens [batch, padding]
//       │  Embedding (pre-trained vectors)
//       ▼
//   [batch, padding, embedding_size]
//       │  Lstm × lstm_layers (lstm_dropout between layers)
//       ▼
//   [batch, padding, lstm_hidden]  → keep the last step
//       │  Dropout + Linear
//       ▼
//   log-probabilities [batch, categories]
//
// The training loop only talks to the model through the
// SequenceClassifier trait: reset the hidden state for a batch,
// then run the forward pass.
//
// Reference: Burn Book §3 (Building Blocks)
//            Hochreiter & Schmidhuber (1997) LSTM

use anyhow::{ensure, Result};
use burn::{
    module::Param,
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig, LstmState,
    },
    prelude::*,
    tensor::{activation::log_softmax, TensorData},
};

use crate::domain::{embedding::EmbeddingTable, settings::Settings};

/// Tag written into checkpoint names and summaries.
pub const MODEL_KIND: &str = "LstmWord2Vec";

// ─── SequenceClassifier ───────────────────────────────────────────────────────
/// The model capability the training loop drives.
pub trait SequenceClassifier<B: Backend> {
    /// Per-batch transient state (one entry per recurrent layer).
    type Hidden;

    /// Fresh, zeroed hidden state for a batch of `batch_size` rows.
    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> Self::Hidden;

    /// tokens: [batch, seq_len] → log-probabilities: [batch, categories]
    fn forward(&self, tokens: Tensor<B, 2, Int>, hidden: Self::Hidden) -> Tensor<B, 2>;
}

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct LstmClassifierConfig {
    /// Rows of the embedding table (vocabulary + reserved tokens)
    pub vocab_rows:     usize,
    pub embedding_size: usize,
    pub categories:     usize,
    pub lstm_layers:    usize,
    pub lstm_hidden:    usize,
    pub dropout:        f64,
    pub lstm_dropout:   f64,
}

impl LstmClassifierConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let m = settings.lstm();
        Self::new(
            settings.embedding_rows(),
            m.embedding_size,
            settings.categories,
            m.lstm_layers,
            m.lstm_hidden,
            m.dropout,
            m.lstm_dropout,
        )
    }

    /// Randomly initialised model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmClassifier<B> {
        let embedding = EmbeddingConfig::new(self.vocab_rows, self.embedding_size).init(device);
        let layers: Vec<Lstm<B>> = (0..self.lstm_layers)
            .map(|i| {
                let d_input = if i == 0 { self.embedding_size } else { self.lstm_hidden };
                LstmConfig::new(d_input, self.lstm_hidden, true).init(device)
            })
            .collect();
        let output = LinearConfig::new(self.lstm_hidden, self.categories).init(device);

        LstmClassifier {
            embedding,
            layers,
            lstm_dropout: DropoutConfig::new(self.lstm_dropout).init(),
            dropout:      DropoutConfig::new(self.dropout).init(),
            output,
            lstm_hidden:  self.lstm_hidden,
        }
    }

    /// Model whose embedding layer holds `table`.
    pub fn init_with_embeddings<B: Backend>(
        &self,
        table:  EmbeddingTable,
        device: &B::Device,
    ) -> Result<LstmClassifier<B>> {
        ensure!(
            table.rows() == self.vocab_rows && table.dim() == self.embedding_size,
            "embedding table is {}x{}, model expects {}x{}",
            table.rows(),
            table.dim(),
            self.vocab_rows,
            self.embedding_size
        );

        let shape  = [table.rows(), table.dim()];
        let weight = Tensor::<B, 2>::from_data(TensorData::new(table.into_values(), shape), device);

        let mut model = self.init(device);
        model.embedding.weight = Param::from_tensor(weight);
        Ok(model)
    }
}

// ─── Model ────────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct LstmClassifier<B: Backend> {
    pub embedding:    Embedding<B>,
    pub layers:       Vec<Lstm<B>>,
    pub lstm_dropout: Dropout,
    pub dropout:      Dropout,
    pub output:       Linear<B>,
    pub lstm_hidden:  usize,
}

impl<B: Backend> SequenceClassifier<B> for LstmClassifier<B> {
    type Hidden = Vec<LstmState<B, 2>>;

    fn init_hidden(&self, batch_size: usize, device: &B::Device) -> Self::Hidden {
        self.layers
            .iter()
            .map(|_| {
                LstmState::new(
                    Tensor::zeros([batch_size, self.lstm_hidden], device),
                    Tensor::zeros([batch_size, self.lstm_hidden], device),
                )
            })
            .collect()
    }

    fn forward(&self, tokens: Tensor<B, 2, Int>, hidden: Self::Hidden) -> Tensor<B, 2> {
        let [batch_size, seq_len] = tokens.dims();
        let last_layer = self.layers.len().saturating_sub(1);

        let mut x = self.embedding.forward(tokens); // [batch, seq_len, embedding_size]
        for (i, (layer, state)) in self.layers.iter().zip(hidden).enumerate() {
            let (out, _) = layer.forward(x, Some(state));
            x = if i < last_layer { self.lstm_dropout.forward(out) } else { out };
        }

        let last_step = x
            .slice([0..batch_size, seq_len - 1..seq_len, 0..self.lstm_hidden])
            .reshape([batch_size, self.lstm_hidden]);

        let logits = self.output.forward(self.dropout.forward(last_step));
        log_softmax(logits, 1)
    }
}

// ─── Loss and predictions ─────────────────────────────────────────────────────
/// Mean negative log-likelihood of `labels` under `log_probs`.
///
/// log_probs: [batch, categories], labels: [batch] → [1]
pub fn nll_loss<B: Backend>(log_probs: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    let [batch_size] = labels.dims();
    log_probs
        .gather(1, labels.reshape([batch_size, 1]))
        .mean()
        .neg()
}

/// Arg-max category of every row.
pub fn predicted_categories<B: Backend>(log_probs: Tensor<B, 2>) -> Vec<i64> {
    // argmax(1) returns [batch, 1]
    log_probs
        .argmax(1)
        .flatten::<1>(0, 1)
        .into_data()
        .iter::<i64>()
        .collect()
}

/// Integer tensor contents as host values.
pub fn int_values<B: Backend>(tensor: Tensor<B, 1, Int>) -> Vec<i64> {
    tensor.into_data().iter::<i64>().collect()
}
