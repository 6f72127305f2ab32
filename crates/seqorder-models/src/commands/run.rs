use crate::cli::RunArgs;
use anyhow::Result;
use seqorder_models::{
    device, evaluate, train, DatasetConfig, EvalOptions, GraphDataset, ModelConfig,
    StorageMode, TrainConfig, TrainingSession,
};

impl RunArgs {
    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            n_node_embed: self.n_node_embed,
            n_lstm_hidden: self.n_lstm_hidden,
            n_seq_embed: self.n_seq_embed,
            n_graph_layers: self.n_graph_layers,
            bidirectional: self.bidirectional,
            graph_to_lstm: self.graph_to_lstm,
            ..Default::default()
        }
    }

    fn train_config(&self) -> TrainConfig {
        TrainConfig {
            n_epoch: self.n_epoch,
            lr: self.lr,
            num_workers: self.num_workers,
            ..Default::default()
        }
    }

    fn storage(&self) -> StorageMode {
        if self.on_the_fly && self.cache_dir.is_some() {
            log::warn!("--on-the-fly given, ignoring --cache-dir");
        }
        match (&self.cache_dir, self.on_the_fly) {
            (_, true) => StorageMode::OnTheFly,
            (Some(dir), false) => StorageMode::BlobStore(dir.clone()),
            (None, false) => StorageMode::InMemory,
        }
    }

    fn train_dataset(&self) -> DatasetConfig {
        DatasetConfig {
            n: self.n_train,
            buffer_size: self.buffer_size,
            min_len: self.min_len,
            max_len: self.max_len,
            seed: self.seed,
            corpus: self.corpus.clone(),
            storage: self.storage(),
        }
    }

    fn val_dataset(&self) -> DatasetConfig {
        DatasetConfig {
            n: self.n_val,
            buffer_size: self.buffer_size,
            min_len: self.min_len,
            max_len: self.max_len,
            seed: self.seed + 1,
            corpus: self.corpus_val.clone(),
            storage: StorageMode::InMemory,
        }
    }
}

pub fn execute(args: RunArgs, verbose: bool) -> Result<()> {
    let device = device(args.gpu)?;

    let val_dataset = GraphDataset::build(&args.val_dataset())?;

    let train_config = args.train_config();
    let mut session =
        TrainingSession::new(&args.model_config(), train_config.lr, args.seed, &device)?;
    if let Some(path) = &args.model {
        session.load_checkpoint(path)?;
        log::info!("trained model {} loaded", path.display());
    }
    if verbose {
        log::debug!("{:#?}", session.model().config());
    }

    if !args.skip_training {
        let train_dataset = GraphDataset::build(&args.train_dataset())?;
        let history = train(&mut session, &train_dataset, Some(&val_dataset), &train_config)?;
        if let Some(path) = &args.save {
            session.save_checkpoint(path)?;
            log::info!("model saved to {}", path.display());
        }
        if let Some(path) = &args.log {
            history.with_params(&args)?.save(path)?;
        }
    }

    let opts = EvalOptions {
        reverse_seq: args.reverse_seq,
        output: args.save_val.clone(),
        verbose: true,
    };
    let acc = evaluate(session.model(), &val_dataset, &opts)?;
    log::info!("test on validation set: {acc:.5}");
    Ok(())
}
