use super::commands;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Be verbose
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train (unless skipped) and evaluate on the validation set
    Run(RunArgs),
    /// Precompute the blob store for a dataset
    Cache(CacheArgs),
}

#[derive(Args, Debug, Clone, Serialize)]
pub struct RunArgs {
    /// Number of training samples
    #[arg(short = 'n', long, default_value_t = 10)]
    pub n_train: usize,

    /// Number of validation samples
    #[arg(long, default_value_t = 10)]
    pub n_val: usize,

    /// Number of training epochs
    #[arg(short = 'e', long, default_value_t = 1)]
    pub n_epoch: usize,

    /// Number of layers in the graph convolution
    #[arg(long, default_value_t = 1)]
    pub n_graph_layers: usize,

    /// Node buffer capacity
    #[arg(short = 'l', long, alias = "max-n-seq", default_value_t = 10)]
    pub buffer_size: usize,

    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    /// Use GPU x, falls back to the CPU when unavailable
    #[arg(short, long)]
    pub gpu: Option<usize>,

    /// Sequence corpus (.csv or .parquet) for training
    #[arg(long)]
    pub corpus: Option<PathBuf>,

    /// Sequence corpus for validation
    #[arg(long)]
    pub corpus_val: Option<PathBuf>,

    /// Minimum sequence length (inclusive)
    #[arg(long, default_value_t = 4)]
    pub min_len: usize,

    /// Maximum sequence length (exclusive)
    #[arg(long, default_value_t = 8)]
    pub max_len: usize,

    #[arg(long, default_value_t = 256)]
    pub n_lstm_hidden: usize,

    #[arg(long, default_value_t = 128)]
    pub n_node_embed: usize,

    #[arg(long, default_value_t = 32)]
    pub n_seq_embed: usize,

    /// Use the graph embedding to initialize the LSTM
    #[arg(long)]
    pub graph_to_lstm: bool,

    /// Use a bidirectional LSTM
    #[arg(long, alias = "blstm")]
    pub bidirectional: bool,

    #[arg(long, default_value_t = 2020)]
    pub seed: u64,

    /// Where to save the trained model
    #[arg(short, long)]
    pub save: Option<PathBuf>,

    /// Directory for validation score matrices
    #[arg(long)]
    pub save_val: Option<PathBuf>,

    /// Pretrained model to start from
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Where to save the training log
    #[arg(long)]
    pub log: Option<PathBuf>,

    #[arg(long)]
    pub skip_training: bool,

    /// Reverse the sequence when validating
    #[arg(long)]
    pub reverse_seq: bool,

    /// Cache the training samples in this directory
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Generate training samples on the fly
    #[arg(long)]
    pub on_the_fly: bool,

    /// Data loading threads
    #[arg(long, default_value_t = 8)]
    pub num_workers: usize,
}

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[arg(short = 'n', long, default_value_t = 10)]
    pub n: usize,

    #[arg(short = 'l', long, alias = "max-n-seq", default_value_t = 10)]
    pub buffer_size: usize,

    #[arg(long)]
    pub corpus: Option<PathBuf>,

    #[arg(long, default_value_t = 4)]
    pub min_len: usize,

    #[arg(long, default_value_t = 8)]
    pub max_len: usize,

    #[arg(long, default_value_t = 2020)]
    pub seed: u64,

    #[arg(long, required = true)]
    pub cache_dir: PathBuf,
}

impl Cli {
    pub fn init_logging(&self) {
        let level = if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }

    pub fn execute(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Run(args) => commands::run::execute(args, self.verbose),
            Commands::Cache(args) => commands::cache::execute(args),
        }
    }
}
