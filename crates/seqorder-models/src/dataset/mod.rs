//! Graph ordering datasets.
//!
//! A [`GraphDataset`] is a fixed number of [`Sample`]s built from either synthetic
//! residues or a filtered corpus, held by one of three [`SampleProvider`]s.
mod builder;
mod loader;
mod provider;
mod sample;

pub use builder::{SampleBuilder, SampleSource, COORDINATE_SCALE, FEATURE_NOISE};
pub use loader::DataLoader;
pub use provider::{BlobStoreProvider, InMemoryProvider, OnTheFlyProvider, SampleProvider};
pub use sample::{Sample, SampleTensors};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use seqorder_io::Corpus;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// Build everything eagerly and keep it in memory.
    InMemory,
    /// Build everything eagerly into a blob store file inside this directory.
    BlobStore(PathBuf),
    /// Build each sample when it is requested.
    OnTheFly,
}

#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Requested sample count. For corpus data `0` means every row.
    pub n: usize,
    pub buffer_size: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub seed: u64,
    pub corpus: Option<PathBuf>,
    pub storage: StorageMode,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            n: 10,
            buffer_size: 10,
            min_len: 4,
            max_len: 8,
            seed: 2020,
            corpus: None,
            storage: StorageMode::InMemory,
        }
    }
}

impl DatasetConfig {
    /// Blob store file name for this configuration.
    pub fn blob_file_name(&self) -> String {
        format!(
            "gcn_lstm_{}_{}_{}_{}_{}.safetensors",
            self.buffer_size, self.min_len, self.max_len, self.n, self.seed
        )
    }
}

pub struct GraphDataset {
    provider: Box<dyn SampleProvider>,
}

impl GraphDataset {
    pub fn build(config: &DatasetConfig) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let (source, n) = match &config.corpus {
            Some(path) => {
                let (records, n) = load_corpus(path, config, &mut rng)
                    .with_context(|| format!("loading corpus {}", path.display()))?;
                (SampleSource::Corpus(Arc::new(records)), n)
            }
            None => (SampleSource::Synthetic, config.n),
        };
        let builder =
            SampleBuilder::new(source, config.buffer_size, config.min_len, config.max_len)?;

        let provider: Box<dyn SampleProvider> = match &config.storage {
            StorageMode::InMemory => Box::new(InMemoryProvider::build(&builder, n, &mut rng)?),
            StorageMode::BlobStore(dir) => {
                let path = dir.join(config.blob_file_name());
                Box::new(BlobStoreProvider::build(&builder, n, &mut rng, path)?)
            }
            StorageMode::OnTheFly => Box::new(OnTheFlyProvider::new(builder, n, rng)),
        };
        Ok(Self { provider })
    }

    pub fn from_provider(provider: Box<dyn SampleProvider>) -> Self {
        Self { provider }
    }

    pub fn len(&self) -> usize {
        self.provider.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provider.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Sample> {
        self.provider.get(index)
    }

    pub fn loader(&self, num_workers: usize) -> DataLoader<'_> {
        DataLoader::new(self.provider.as_ref(), num_workers)
    }
}

/// Filter the corpus and settle the sample count.
fn load_corpus(
    path: &Path,
    config: &DatasetConfig,
    rng: &mut StdRng,
) -> Result<(Vec<seqorder_io::CorpusRecord>, usize)> {
    let corpus = Corpus::read(path)?;
    let total = corpus.len();
    let mut corpus = corpus
        .filter_length(config.min_len, config.max_len)?
        .filter_standard()?;
    log::info!(
        "Using {} out of {} sequences from {}",
        corpus.len(),
        total,
        path.display()
    );
    let n = if 0 < config.n && config.n <= corpus.len() {
        corpus = corpus.sample(config.n, rng)?;
        config.n
    } else {
        corpus.len()
    };
    if n == 0 {
        log::warn!("no sequences left after filtering {}", path.display());
    } else {
        let lens = corpus.lengths()?;
        let mean = lens.iter().sum::<i64>() as f64 / lens.len() as f64;
        log::info!(
            "len: count {} mean {:.2} min {} max {}",
            lens.len(),
            mean,
            lens.iter().min().copied().unwrap_or_default(),
            lens.iter().max().copied().unwrap_or_default()
        );
    }
    Ok((corpus.records()?, n))
}
