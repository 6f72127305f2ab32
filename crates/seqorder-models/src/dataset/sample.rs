use candle_core::{Device, Result, Tensor};
use seqorder_core::{chain_adjacency, degree_normalize, onehot, ALPHABET_SIZE};

/// One ordering problem: `seq_len` real nodes scattered over a buffer of `M` slots.
///
/// All vectors are in physical slot order except `gt_sequence` and `gt_order`,
/// which follow the logical order of the real nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub seq_len: usize,
    /// Node id per slot. Real nodes carry `0..seq_len`, padding nodes ids `>= max_len`.
    pub slot_ids: Vec<i64>,
    /// Row-major `M x 20` noisy one-hot features.
    pub features: Vec<f32>,
    /// Residue class per slot.
    pub residues: Vec<u32>,
    pub gt_sequence: Vec<u32>,
    /// Slot of each real node, in logical order.
    pub gt_order: Vec<u32>,
    /// Row-major `M x M` contact map, when the sample came with coordinates.
    pub contacts: Option<Vec<f32>>,
}

/// Model inputs of a [`Sample`] on a device.
#[derive(Debug, Clone)]
pub struct SampleTensors {
    /// `[seq_len, 20]` one-hot of the ground-truth sequence.
    pub sequence: Tensor,
    /// `[M, 20]`
    pub features: Tensor,
    /// `[M, M]`
    pub adjacency: Tensor,
    /// `[M, M]` diagonal.
    pub degree: Tensor,
    /// `[seq_len]` u32 slot targets.
    pub target: Tensor,
}

impl Sample {
    pub fn buffer_size(&self) -> usize {
        self.slot_ids.len()
    }

    /// Dominant class of every slot's feature row.
    pub fn feature_classes(&self) -> Vec<u32> {
        self.features
            .chunks_exact(ALPHABET_SIZE)
            .map(|row| {
                let mut best = 0;
                for (k, v) in row.iter().enumerate() {
                    if *v > row[best] {
                        best = k;
                    }
                }
                best as u32
            })
            .collect()
    }

    pub fn to_tensors(&self, device: &Device) -> Result<SampleTensors> {
        let m = self.buffer_size();
        let sequence = onehot(&self.gt_sequence, device).map_err(candle_core::Error::wrap)?;
        let features = Tensor::from_slice(&self.features, (m, ALPHABET_SIZE), device)?;
        let adjacency = match &self.contacts {
            Some(contacts) => Tensor::from_slice(contacts, (m, m), device)?,
            None => chain_adjacency(&self.slot_ids, true, device)?,
        };
        let degree = degree_normalize(&adjacency)?;
        let target = Tensor::from_slice(&self.gt_order, self.seq_len, device)?;
        Ok(SampleTensors {
            sequence,
            features,
            adjacency,
            degree,
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        // buffer of 4, real nodes 0..3 at slots 2, 0, 3; padding id 9 at slot 1
        let residues = vec![4u32, 7, 0, 19];
        let mut features = vec![0f32; 4 * ALPHABET_SIZE];
        for (j, r) in residues.iter().enumerate() {
            features[j * ALPHABET_SIZE + *r as usize] = 1.0;
        }
        Sample {
            seq_len: 3,
            slot_ids: vec![1, 9, 0, 2],
            features,
            residues,
            gt_sequence: vec![0, 4, 19],
            gt_order: vec![2, 0, 3],
            contacts: None,
        }
    }

    #[test]
    fn test_feature_classes() {
        assert_eq!(sample().feature_classes(), vec![4, 7, 0, 19]);
    }

    #[test]
    fn test_to_tensors() {
        let s = sample();
        let t = s.to_tensors(&Device::Cpu).unwrap();
        assert_eq!(t.sequence.dims(), &[3, ALPHABET_SIZE]);
        assert_eq!(t.features.dims(), &[4, ALPHABET_SIZE]);
        assert_eq!(t.target.to_vec1::<u32>().unwrap(), vec![2, 0, 3]);
        let a = t.adjacency.to_vec2::<f32>().unwrap();
        // ids 1-0 and 1-2 are neighbours, 9 is isolated apart from its self loop
        assert_eq!(a[0], vec![1.0, 0.0, 1.0, 1.0]);
        assert_eq!(a[1], vec![0.0, 1.0, 0.0, 0.0]);
        let d = t.degree.to_vec2::<f32>().unwrap();
        assert_eq!(d[1][1], 1.0);
    }

    #[test]
    fn test_contacts_override_chain() {
        let mut s = sample();
        s.contacts = Some(vec![1.0; 16]);
        let t = s.to_tensors(&Device::Cpu).unwrap();
        assert_eq!(t.adjacency.to_vec2::<f32>().unwrap()[1], vec![1.0; 4]);
    }
}
