use crate::cli::CacheArgs;
use anyhow::Result;
use seqorder_models::{DatasetConfig, GraphDataset, StorageMode};

pub fn execute(args: CacheArgs) -> Result<()> {
    let config = DatasetConfig {
        n: args.n,
        buffer_size: args.buffer_size,
        min_len: args.min_len,
        max_len: args.max_len,
        seed: args.seed,
        corpus: args.corpus,
        storage: StorageMode::BlobStore(args.cache_dir.clone()),
    };
    let dataset = GraphDataset::build(&config)?;
    log::info!(
        "{} samples cached in {}",
        dataset.len(),
        args.cache_dir.join(config.blob_file_name()).display()
    );
    Ok(())
}
