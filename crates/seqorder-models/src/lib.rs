//! seqorder-models
//!
//! Recover the order of residues scattered over a fixed-size node buffer.
//!
//! - datasets of scrambled synthetic or corpus sequences, in memory, cached or built on the fly
//! - a graph convolution + LSTM model scoring (position, node) pairs
//! - training with an order-symmetric loss, evaluation and checkpoints
//!
//! ```shell
//! cargo run --bin seqorder -- run --n-train 100 --n-val 10
//! cargo run --bin seqorder --features metal -- run --gpu 0
//! ```
pub mod checkpoint;
pub mod dataset;
pub mod evaluation;
pub mod history;
pub mod model;
pub mod training;

mod device;

pub use dataset::{DatasetConfig, GraphDataset, Sample, StorageMode};
pub use device::device;
pub use evaluation::{evaluate, ordering_accuracy, EvalOptions};
pub use history::TrainingLog;
pub use model::{ModelConfig, OrderingModel, OrderingOutput};
pub use training::{symmetric_loss, train, TrainConfig, TrainingSession};
