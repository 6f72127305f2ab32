use crate::dataset::GraphDataset;
use crate::model::{reverse_rows, OrderingModel};
use anyhow::{Context, Result};
use seqorder_core::decode_sequence;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Also run the reversed sequence and patch positions it gets right.
    pub reverse_seq: bool,
    /// Directory for per-sample score matrices (`{index:06}.npy`).
    pub output: Option<PathBuf>,
    /// Log ground truth and prediction for every sample at debug level.
    pub verbose: bool,
}

/// Fraction of positions matching `gt`, read forwards or backwards, whichever is higher.
pub fn ordering_accuracy(predicted: &[u32], gt: &[u32]) -> f64 {
    if gt.is_empty() {
        return 0.0;
    }
    let forward = predicted.iter().zip(gt).filter(|(p, g)| p == g).count();
    let backward = predicted
        .iter()
        .zip(gt.iter().rev())
        .filter(|(p, g)| p == g)
        .count();
    forward.max(backward) as f64 / gt.len() as f64
}

/// Take the reversed-input prediction at positions where its residue class matches the
/// ground truth and the forward prediction's does not.
///
/// `classes` maps a slot to its residue class. `reversed` is already back in forward order.
pub fn reverse_substitution(predicted: &mut [u32], reversed: &[u32], gt: &[u32], classes: &[u32]) {
    let class = |slot: u32| classes[slot as usize];
    for ((pred, &rev), &g) in predicted.iter_mut().zip(reversed).zip(gt) {
        if class(g) == class(rev) && class(g) != class(*pred) {
            *pred = rev;
        }
    }
}

/// Mean ordering accuracy of `model` over `dataset`.
pub fn evaluate(model: &OrderingModel, dataset: &GraphDataset, opts: &EvalOptions) -> Result<f64> {
    if dataset.is_empty() {
        log::warn!("evaluating an empty dataset");
        return Ok(0.0);
    }
    if let Some(dir) = &opts.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating score directory {}", dir.display()))?;
    }
    let device = model.device();
    let mut acc_all = 0.0;
    for j in 0..dataset.len() {
        let sample = dataset.get(j)?;
        let t = sample.to_tensors(device)?;
        let out = model.infer(&t.sequence, &t.features, &t.adjacency, &t.degree)?;
        let mut order = out.order;
        let classes = sample.feature_classes();
        if opts.reverse_seq {
            let rev_sequence = reverse_rows(&t.sequence)?;
            let mut rev_order = model
                .infer(&rev_sequence, &t.features, &t.adjacency, &t.degree)?
                .order;
            rev_order.reverse();
            reverse_substitution(&mut order, &rev_order, &sample.gt_order, &classes);
        }
        let acc = ordering_accuracy(&order, &sample.gt_order);
        acc_all += acc;

        if opts.verbose {
            let gt_classes: Vec<u32> = sample.gt_order.iter().map(|&s| classes[s as usize]).collect();
            let pr_classes: Vec<u32> = order.iter().map(|&s| classes[s as usize]).collect();
            log::debug!("GT {}", decode_sequence(&gt_classes)?);
            log::debug!("PR {}", decode_sequence(&pr_classes)?);
            log::debug!("GT {:?} {}", sample.gt_order, sample.seq_len);
            log::debug!("PR {:?} {}", order, sample.seq_len);
            log::debug!("{j} {acc}");
        }
        if let Some(dir) = &opts.output {
            let path = dir.join(format!("{j:06}.npy"));
            out.scores
                .write_npy(&path)
                .with_context(|| format!("writing scores {}", path.display()))?;
        }
    }
    let acc_all = acc_all / dataset.len() as f64;
    if opts.verbose {
        log::info!("overall acc: {acc_all}");
    }
    Ok(acc_all)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_exact_and_reversed() {
        let gt = [2u32, 0, 3, 1];
        assert_eq!(ordering_accuracy(&gt, &gt), 1.0);
        assert_eq!(ordering_accuracy(&[1, 3, 0, 2], &gt), 1.0);
        assert_eq!(ordering_accuracy(&[2, 0, 1, 3], &gt), 0.5);
        assert_eq!(ordering_accuracy(&[3, 3, 3, 3], &gt), 0.25);
        assert_eq!(ordering_accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_accuracy_bounds() {
        let gt = [0u32, 1, 2, 3, 4];
        for pred in [[4u32, 4, 4, 4, 4], [0, 1, 2, 3, 4], [1, 0, 3, 2, 4]] {
            let acc = ordering_accuracy(&pred, &gt);
            assert!((0.0..=1.0).contains(&acc));
        }
    }

    #[test]
    fn test_reverse_substitution() {
        // slot classes: 0->A(0), 1->R(1), 2->A(0), 3->N(2)
        let classes = [0u32, 1, 0, 2];
        let gt = [0u32, 1, 3];
        let mut pred = vec![0u32, 3, 1];
        let rev = [2u32, 1, 0];
        reverse_substitution(&mut pred, &rev, &gt, &classes);
        // position 0: forward already has the right class, kept
        // position 1: forward class N != R, reverse class R matches, substituted
        // position 2: reverse class A != N, kept
        assert_eq!(pred, vec![0, 1, 1]);
    }
}
