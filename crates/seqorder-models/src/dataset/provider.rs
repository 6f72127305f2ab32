//! Sample providers: the three ways a dataset can hold its samples.
use super::builder::SampleBuilder;
use super::sample::Sample;
use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use rand::rngs::StdRng;
use seqorder_io::{BlobStore, BlobWriter};
use seqorder_core::ALPHABET_SIZE;
use std::path::Path;
use std::sync::Mutex;

/// Built samples between progress lines.
const PROGRESS_EVERY: usize = 10_000;

const IDXS: &str = "idxs";
const FEATURES: &str = "f";
const SEQ: &str = "seq";
const GT_SEQ: &str = "gt_seq";
const GT_IDXS: &str = "gt_idxs";
const CONTACTS: &str = "a";

pub trait SampleProvider: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Sample>;

    /// Whether `get` gives the same answer regardless of call order and thread.
    fn supports_parallel(&self) -> bool {
        true
    }
}

fn build_all<F>(builder: &SampleBuilder, n: usize, rng: &mut StdRng, mut sink: F) -> Result<()>
where
    F: FnMut(usize, Sample) -> Result<()>,
{
    for i in 0..n {
        let sample = builder.build(i, rng)?;
        sink(i, sample)?;
        if (i + 1) % PROGRESS_EVERY == 0 {
            log::info!("processed {} sequences", i + 1);
        }
    }
    Ok(())
}

/// Every sample built up front and kept in memory.
pub struct InMemoryProvider {
    samples: Vec<Sample>,
}

impl InMemoryProvider {
    pub fn build(builder: &SampleBuilder, n: usize, rng: &mut StdRng) -> Result<Self> {
        let mut samples = Vec::with_capacity(n);
        build_all(builder, n, rng, |_, sample| {
            samples.push(sample);
            Ok(())
        })?;
        Ok(Self { samples })
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl SampleProvider for InMemoryProvider {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow!("sample {index} out of range ({})", self.samples.len()))
    }
}

/// Samples written once to a blob store file and read back by key.
pub struct BlobStoreProvider {
    store: BlobStore,
    n: usize,
}

impl BlobStoreProvider {
    pub fn build<P: AsRef<Path>>(
        builder: &SampleBuilder,
        n: usize,
        rng: &mut StdRng,
        path: P,
    ) -> Result<Self> {
        let device = Device::Cpu;
        let mut writer = BlobWriter::create(path.as_ref())?;
        build_all(builder, n, rng, |i, s| {
            let m = s.buffer_size();
            writer.insert(IDXS, i, &Tensor::from_slice(&s.slot_ids, m, &device)?)?;
            writer.insert(
                FEATURES,
                i,
                &Tensor::from_slice(&s.features, (m, ALPHABET_SIZE), &device)?,
            )?;
            writer.insert(SEQ, i, &Tensor::from_slice(&s.residues, m, &device)?)?;
            writer.insert(
                GT_SEQ,
                i,
                &Tensor::from_slice(&s.gt_sequence, s.seq_len, &device)?,
            )?;
            writer.insert(GT_IDXS, i, &Tensor::from_slice(&s.gt_order, s.seq_len, &device)?)?;
            if let Some(contacts) = &s.contacts {
                writer.insert(CONTACTS, i, &Tensor::from_slice(contacts, (m, m), &device)?)?;
            }
            Ok(())
        })?;
        let path = writer.finish()?;
        log::info!("cached {n} samples in {}", path.display());
        Self::open(path, n)
    }

    pub fn open<P: AsRef<Path>>(path: P, n: usize) -> Result<Self> {
        Ok(Self {
            store: BlobStore::open(path)?,
            n,
        })
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }
}

impl SampleProvider for BlobStoreProvider {
    fn len(&self) -> usize {
        self.n
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let device = Device::Cpu;
        let slot_ids = self.store.get(IDXS, index, &device)?.to_vec1::<i64>()?;
        let features = self
            .store
            .get(FEATURES, index, &device)?
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        let residues = self.store.get(SEQ, index, &device)?.to_vec1::<u32>()?;
        let gt_sequence = self.store.get(GT_SEQ, index, &device)?.to_vec1::<u32>()?;
        let gt_order = self.store.get(GT_IDXS, index, &device)?.to_vec1::<u32>()?;
        let contacts = if self.store.contains(CONTACTS, index) {
            Some(
                self.store
                    .get(CONTACTS, index, &device)?
                    .flatten_all()?
                    .to_vec1::<f32>()?,
            )
        } else {
            None
        };
        Ok(Sample {
            seq_len: gt_order.len(),
            slot_ids,
            features,
            residues,
            gt_sequence,
            gt_order,
            contacts,
        })
    }
}

/// Rebuilds a sample on every access from one shared generator.
///
/// Results depend on the order and number of `get` calls, so access is serialized
/// and the loader never fans it out.
pub struct OnTheFlyProvider {
    builder: SampleBuilder,
    rng: Mutex<StdRng>,
    n: usize,
}

impl OnTheFlyProvider {
    pub fn new(builder: SampleBuilder, n: usize, rng: StdRng) -> Self {
        Self {
            builder,
            rng: Mutex::new(rng),
            n,
        }
    }
}

impl SampleProvider for OnTheFlyProvider {
    fn len(&self) -> usize {
        self.n
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow!("sample generator lock poisoned"))?;
        Ok(self.builder.build(index, &mut *rng)?)
    }

    fn supports_parallel(&self) -> bool {
        false
    }
}
