// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between preprocessed files on disk and tensor
// batches on the device:
//
//   train/val/test files   (label t1 t2 ... tW per line)
//       │
//       ▼
//   SampleDataset        → parses rows, implements Burn's Dataset
//       │
//       ▼
//   SampleBatcher        → stacks samples into label/token tensors
//       │
//       ▼
//   DataLoader           → feeds batches to the training loop
//
//   word vector file
//       │
//       ▼
//   WordVectorFile       → EmbeddingTable for the model's first layer
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Implements Burn's Dataset trait over one split file
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Reads pre-trained word vectors
pub mod embeddings;
