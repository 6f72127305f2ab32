use crate::checkpoint::{load_checkpoint, save_checkpoint};
use crate::dataset::{GraphDataset, Sample};
use crate::evaluation::{evaluate, EvalOptions};
use crate::history::{TrainRecord, TrainingLog, ValRecord, ValSeenRecord};
use crate::model::{seed_parameters, ModelConfig, OrderingModel};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::loss::cross_entropy;
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub n_epoch: usize,
    pub lr: f64,
    pub print_every: usize,
    pub log_every: usize,
    pub val_every: usize,
    pub num_workers: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            n_epoch: 1,
            lr: 0.1,
            print_every: 100,
            log_every: 100,
            val_every: 2000,
            num_workers: 8,
        }
    }
}

/// Parameters, optimizer state and the processed-sample counter of one training run.
pub struct TrainingSession {
    model: OrderingModel,
    varmap: VarMap,
    optimizer: AdamW,
    seen: u64,
}

impl TrainingSession {
    /// Fresh model on `device` with parameters drawn from `seed`.
    pub fn new(
        config: &ModelConfig,
        lr: f64,
        seed: u64,
        device: &Device,
    ) -> candle_core::Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = OrderingModel::load(vb, config)?;
        seed_parameters(&varmap, seed)?;
        // Adam without weight decay
        let params = ParamsAdamW {
            lr,
            weight_decay: 0.0,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;
        Ok(Self {
            model,
            varmap,
            optimizer,
            seen: 0,
        })
    }

    pub fn model(&self) -> &OrderingModel {
        &self.model
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn device(&self) -> &Device {
        self.model.device()
    }

    /// One optimizer step on one sample. Returns the loss.
    pub fn step(&mut self, sample: &Sample) -> candle_core::Result<f32> {
        let t = sample.to_tensors(self.model.device())?;
        let scores = self
            .model
            .scores(&t.sequence, &t.features, &t.adjacency, &t.degree)?;
        let loss = symmetric_loss(&scores, &t.target)?;
        self.optimizer.backward_step(&loss)?;
        self.seen += 1;
        loss.to_scalar::<f32>()
    }

    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> candle_core::Result<()> {
        save_checkpoint(&self.varmap, self.seen, path)
    }

    /// Restore parameters and counter. The optimizer state starts fresh.
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> candle_core::Result<()> {
        self.seen = load_checkpoint(&mut self.varmap, path)?;
        Ok(())
    }
}

/// Cross-entropy against the target order or its reverse, whichever is lower.
///
/// Ties keep the forward loss.
pub fn symmetric_loss(scores: &Tensor, target: &Tensor) -> candle_core::Result<Tensor> {
    let n = target.dim(0)?;
    let rev: Vec<u32> = (0..n as u32).rev().collect();
    let rev = Tensor::from_vec(rev, n, target.device())?;
    let reversed = target.index_select(&rev, 0)?;
    let forward = cross_entropy(scores, target)?;
    let backward = cross_entropy(scores, &reversed)?;
    if backward.to_scalar::<f32>()? < forward.to_scalar::<f32>()? {
        Ok(backward)
    } else {
        Ok(forward)
    }
}

fn every(period: usize, iter: usize) -> bool {
    period > 0 && iter % period == 0
}

/// Train for `config.n_epoch` passes over `dataset`, validating on `val` when given.
pub fn train(
    session: &mut TrainingSession,
    dataset: &GraphDataset,
    val: Option<&GraphDataset>,
    config: &TrainConfig,
) -> Result<TrainingLog> {
    log::info!("====================== train ======================");
    let mut history = TrainingLog::default();
    if dataset.is_empty() {
        log::warn!("training dataset is empty, nothing to do");
    }
    let quiet = EvalOptions::default();
    let t0 = Instant::now();
    for epoch in 0..config.n_epoch {
        let t1 = Instant::now();
        for (j, sample) in dataset.loader(config.num_workers).enumerate() {
            let sample = sample?;
            let loss = session.step(&sample)?;
            let iter = j + 1;
            if every(config.log_every, iter) {
                history.train.push(TrainRecord {
                    epoch: epoch + 1,
                    iter,
                    seen: session.seen(),
                    loss,
                });
            }
            if every(config.print_every, iter) {
                log::info!("epoch {epoch} loss {loss:.4}");
            }
            if every(config.val_every, iter) {
                if let Some(val) = val {
                    let acc = evaluate(session.model(), val, &quiet)?;
                    history.val_seen.push(ValSeenRecord {
                        seen: session.seen(),
                        acc,
                    });
                    let per_sample = t1.elapsed().as_secs_f64() / iter as f64;
                    let eta = per_sample * (dataset.len() - iter) as f64;
                    log::info!(
                        "seen {}, acc {acc:.4}, {eta:.1}s to go for this epoch",
                        session.seen()
                    );
                }
            }
        }
        if let Some(val) = val {
            let acc = evaluate(session.model(), val, &quiet)?;
            history.val.push(ValRecord { epoch, acc });
            log::info!("seen {}, acc {acc:.4}", session.seen());
        }
        let elapsed = t0.elapsed().as_secs_f64();
        let remaining = elapsed / (epoch + 1) as f64 * (config.n_epoch - epoch - 1) as f64;
        log::info!(
            "time elapsed {elapsed:.1}s, {:.1}s for this epoch, {remaining:.1}s to go",
            t1.elapsed().as_secs_f64()
        );
        log::info!("{}", "=".repeat(80));
    }
    Ok(history)
}
