use candle_core::{Module, Result, Tensor, D};
use candle_nn::{linear, Linear, VarBuilder};

/// Scores every (sequence position, node slot) pair.
#[derive(Debug, Clone)]
pub struct PairwiseScorer {
    node2addedge: Linear,
    graph2addedge: Linear,
}

impl PairwiseScorer {
    pub fn load(vb: VarBuilder, n_node_embed: usize, n_seq_hidden: usize) -> Result<Self> {
        let node2addedge = linear(n_node_embed, n_seq_hidden, vb.pp("node2addedge"))?;
        let graph2addedge = linear(n_seq_hidden, 1, vb.pp("graph2addedge"))?;
        Ok(Self {
            node2addedge,
            graph2addedge,
        })
    }

    /// `nodes` is `[M, n_node_embed]`, `sequence` is `[n, n_seq_hidden]`; returns `[n, M]`.
    pub fn forward(&self, nodes: &Tensor, sequence: &Tensor) -> Result<Tensor> {
        let nodes = self.node2addedge.forward(nodes)?;
        let pairs = nodes
            .unsqueeze(0)?
            .broadcast_add(&sequence.unsqueeze(1)?)?
            .relu()?;
        self.graph2addedge.forward(&pairs)?.squeeze(D::Minus1)
    }
}

/// Row-wise argmax of a `[n, M]` score matrix. Ties go to the lowest slot.
pub fn greedy_order(scores: &Tensor) -> Result<Vec<u32>> {
    let rows = scores.to_vec2::<f32>()?;
    Ok(rows
        .iter()
        .map(|row| {
            let mut best = 0;
            for (j, v) in row.iter().enumerate() {
                if *v > row[best] {
                    best = j;
                }
            }
            best as u32
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_greedy_ties_take_first() {
        let scores = Tensor::new(
            &[[0.1f32, 0.9, 0.9, 0.0], [2.0, 2.0, 2.0, 2.0], [-1.0, -3.0, -0.5, -0.5]],
            &Device::Cpu,
        )
        .unwrap();
        assert_eq!(greedy_order(&scores).unwrap(), vec![1, 0, 2]);
    }

    #[test]
    fn test_score_shape() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let scorer = PairwiseScorer::load(vb, 8, 6).unwrap();
        let nodes = Tensor::randn(0f32, 1.0, (10, 8), &Device::Cpu).unwrap();
        let seq = Tensor::randn(0f32, 1.0, (4, 6), &Device::Cpu).unwrap();
        let scores = scorer.forward(&nodes, &seq).unwrap();
        assert_eq!(scores.dims(), &[4, 10]);
        assert_eq!(greedy_order(&scores).unwrap().len(), 4);
    }
}
