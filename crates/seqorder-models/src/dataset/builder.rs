use super::sample::Sample;
use candle_core::{bail, Device, Result, Tensor};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;
use seqorder_core::{contact_map, encode_sequence, ALPHABET_SIZE, DEFAULT_CONTACT_CUTOFF};
use seqorder_io::CorpusRecord;
use std::sync::Arc;

/// Scale applied to corpus CA coordinates before building contact maps.
pub const COORDINATE_SCALE: f32 = 0.01;

/// Magnitude of the half-normal noise added to every feature column.
pub const FEATURE_NOISE: f32 = 0.01;

/// Where the residues of a sample come from.
#[derive(Debug, Clone)]
pub enum SampleSource {
    /// Uniform random lengths and residues.
    Synthetic,
    /// Filtered corpus rows, indexed by sample index.
    Corpus(Arc<Vec<CorpusRecord>>),
}

#[derive(Debug, Clone)]
pub struct SampleBuilder {
    source: SampleSource,
    buffer_size: usize,
    min_len: usize,
    max_len: usize,
}

impl SampleBuilder {
    pub fn new(
        source: SampleSource,
        buffer_size: usize,
        min_len: usize,
        max_len: usize,
    ) -> Result<Self> {
        // lengths are drawn from [min_len, max_len), the longest must fit the buffer
        if max_len > buffer_size + 1 {
            bail!("sequences up to {} residues do not fit a buffer of {buffer_size}", max_len - 1);
        }
        if matches!(source, SampleSource::Synthetic) && (min_len == 0 || min_len >= max_len) {
            bail!("invalid length range [{min_len}, {max_len})");
        }
        Ok(Self {
            source,
            buffer_size,
            min_len,
            max_len,
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Build sample `index`, drawing all randomness from `rng`.
    pub fn build<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Sample> {
        let mut contacts = None;
        let (seq_len, seq) = match &self.source {
            SampleSource::Synthetic => {
                let seq_len = rng.gen_range(self.min_len..self.max_len);
                let seq: Vec<u32> = (0..seq_len)
                    .map(|_| rng.gen_range(0..ALPHABET_SIZE as u32))
                    .collect();
                (seq_len, seq)
            }
            SampleSource::Corpus(records) => {
                let Some(record) = records.get(index) else {
                    bail!("sample {index} is out of range for {} records", records.len());
                };
                let seq = encode_sequence(&record.seq).map_err(candle_core::Error::wrap)?;
                if seq.len() != record.len {
                    bail!(
                        "record {index}: len is {} but the sequence has {} residues",
                        record.len,
                        seq.len()
                    );
                }
                if let Some(coords) = &record.ca_coords {
                    contacts = Some(record_contacts(index, coords, record.mask.as_deref())?);
                }
                (record.len, seq)
            }
        };

        // Contact-map samples keep their logical order and carry no padding.
        let (slot_ids, residues) = if contacts.is_some() {
            ((0..seq_len as i64).collect::<Vec<_>>(), seq)
        } else {
            self.scramble(seq_len, seq, rng)?
        };

        let mut features = vec![0f32; residues.len() * ALPHABET_SIZE];
        for v in features.iter_mut() {
            let z: f32 = rng.sample(StandardNormal);
            *v = FEATURE_NOISE * z.abs();
        }
        for (row, &class) in features.chunks_exact_mut(ALPHABET_SIZE).zip(residues.iter()) {
            let noise: f32 = row.iter().sum();
            row[class as usize] += 1.0 - noise;
        }

        let gt_order = ground_truth_order(&slot_ids, seq_len);
        let gt_sequence = gt_order.iter().map(|&slot| residues[slot as usize]).collect();
        Ok(Sample {
            seq_len,
            slot_ids,
            features,
            residues,
            gt_sequence,
            gt_order,
            contacts,
        })
    }

    /// Pad to the buffer size and permute all slots with one random permutation.
    fn scramble<R: Rng + ?Sized>(
        &self,
        seq_len: usize,
        seq: Vec<u32>,
        rng: &mut R,
    ) -> Result<(Vec<i64>, Vec<u32>)> {
        let Some(n_pad) = self.buffer_size.checked_sub(seq_len) else {
            bail!("sequence of {seq_len} residues exceeds the buffer of {}", self.buffer_size);
        };
        let mut pool: Vec<i64> = (self.max_len as i64..2 * self.buffer_size as i64).collect();
        if pool.len() < n_pad {
            bail!("not enough padding ids for {n_pad} padding nodes");
        }
        pool.shuffle(rng);
        pool.truncate(n_pad);

        let mut perm: Vec<usize> = (0..self.buffer_size).collect();
        perm.shuffle(rng);

        let ids: Vec<i64> = (0..seq_len as i64).chain(pool).collect();
        let pad_residues = (0..n_pad).map(|_| rng.gen_range(0..ALPHABET_SIZE as u32));
        let residues: Vec<u32> = seq.into_iter().chain(pad_residues).collect();

        let slot_ids = perm.iter().map(|&p| ids[p]).collect();
        let residues = perm.iter().map(|&p| residues[p]).collect();
        Ok((slot_ids, residues))
    }
}

/// Slots of the `seq_len` smallest ids, ordered by id.
fn ground_truth_order(slot_ids: &[i64], seq_len: usize) -> Vec<u32> {
    let mut order: Vec<u32> = (0..slot_ids.len() as u32).collect();
    order.sort_by_key(|&slot| slot_ids[slot as usize]);
    order.truncate(seq_len);
    order
}

fn record_contacts(index: usize, coords: &[[f32; 3]], mask: Option<&[bool]>) -> Result<Vec<f32>> {
    let flat: Vec<f32> = coords
        .iter()
        .flatten()
        .map(|v| v * COORDINATE_SCALE)
        .collect();
    let coords = Tensor::from_vec(flat, (coords.len(), 3), &Device::Cpu)?;
    let cmap = contact_map(&coords, mask, DEFAULT_CONTACT_CUTOFF)?;
    log::debug!("sample {index}: contact map created {:?}", cmap.dims());
    cmap.flatten_all()?.to_vec1::<f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(seq: &str, coords: Option<Vec<[f32; 3]>>) -> CorpusRecord {
        CorpusRecord {
            len: seq.len(),
            seq: seq.to_string(),
            ca_coords: coords,
            mask: None,
        }
    }

    #[test]
    fn test_synthetic_sample_invariants() {
        let builder = SampleBuilder::new(SampleSource::Synthetic, 10, 4, 8).unwrap();
        let mut rng = StdRng::seed_from_u64(2020);
        for i in 0..50 {
            let s = builder.build(i, &mut rng).unwrap();
            assert!((4..8).contains(&s.seq_len));
            assert_eq!(s.buffer_size(), 10);
            assert_eq!(s.residues.len(), 10);
            assert_eq!(s.gt_order.len(), s.seq_len);
            assert_eq!(s.gt_sequence.len(), s.seq_len);

            // the target is a permutation of the real slots
            let mut real: Vec<u32> = (0..10u32)
                .filter(|&slot| s.slot_ids[slot as usize] < s.seq_len as i64)
                .collect();
            let mut gt = s.gt_order.clone();
            real.sort();
            gt.sort();
            assert_eq!(gt, real);

            // logical order is recovered through the target
            for (k, &slot) in s.gt_order.iter().enumerate() {
                assert_eq!(s.slot_ids[slot as usize], k as i64);
                assert_eq!(s.gt_sequence[k], s.residues[slot as usize]);
            }

            // padding ids come from [max_len, 2 * buffer) and never repeat
            let mut pad: Vec<i64> = s
                .slot_ids
                .iter()
                .copied()
                .filter(|&id| id >= s.seq_len as i64)
                .collect();
            assert!(pad.iter().all(|&id| (8..20).contains(&id)));
            pad.sort();
            pad.dedup();
            assert_eq!(pad.len(), 10 - s.seq_len);
        }
    }

    #[test]
    fn test_feature_rows_sum_to_one() {
        let builder = SampleBuilder::new(SampleSource::Synthetic, 6, 2, 5).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let s = builder.build(0, &mut rng).unwrap();
        for (row, &class) in s.features.chunks_exact(ALPHABET_SIZE).zip(s.residues.iter()) {
            let total: f32 = row.iter().sum();
            assert!((total - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|v| *v >= 0.0));
            assert!(row[class as usize] > 0.5);
        }
        assert_eq!(s.feature_classes(), s.residues);
    }

    #[test]
    fn test_same_seed_same_sample() {
        let builder = SampleBuilder::new(SampleSource::Synthetic, 10, 4, 8).unwrap();
        let a = builder.build(0, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = builder.build(0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_buffer_must_fit_max_len() {
        assert!(SampleBuilder::new(SampleSource::Synthetic, 6, 4, 8).is_err());
        assert!(SampleBuilder::new(SampleSource::Synthetic, 8, 8, 8).is_err());
        assert!(SampleBuilder::new(SampleSource::Synthetic, 8, 0, 4).is_err());
        // the longest sequence may fill the whole buffer
        let builder = SampleBuilder::new(SampleSource::Synthetic, 4, 4, 5).unwrap();
        let s = builder.build(0, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(s.seq_len, 4);
        assert_eq!(s.buffer_size(), 4);
        let mut ids = s.slot_ids.clone();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_corpus_sample_without_coordinates_is_padded() {
        let records = Arc::new(vec![record("MKVLA", None)]);
        let builder = SampleBuilder::new(SampleSource::Corpus(records), 10, 4, 8).unwrap();
        let s = builder.build(0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(s.seq_len, 5);
        assert_eq!(s.buffer_size(), 10);
        assert_eq!(s.gt_sequence, vec![12, 11, 19, 10, 0]);
        assert!(s.contacts.is_none());
    }

    #[test]
    fn test_corpus_sample_with_coordinates_keeps_order() {
        let coords = vec![[0.0, 0.0, 0.0], [300.0, 0.0, 0.0], [1000.0, 0.0, 0.0]];
        let records = Arc::new(vec![record("MKV", Some(coords))]);
        let builder = SampleBuilder::new(SampleSource::Corpus(records), 10, 2, 8).unwrap();
        let s = builder.build(0, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(s.buffer_size(), 3);
        assert_eq!(s.slot_ids, vec![0, 1, 2]);
        assert_eq!(s.gt_order, vec![0, 1, 2]);
        // scaled distances are 3 and 7: only the first pair is in contact
        let contacts = s.contacts.unwrap();
        assert_eq!(contacts, vec![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_corpus_length_mismatch_fails() {
        let mut bad = record("MKV", None);
        bad.len = 5;
        let builder =
            SampleBuilder::new(SampleSource::Corpus(Arc::new(vec![bad])), 10, 2, 8).unwrap();
        assert!(builder.build(0, &mut StdRng::seed_from_u64(0)).is_err());
        assert!(builder.build(1, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
