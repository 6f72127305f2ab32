use candle_core::{bail, Device, Module, Result, Tensor};
use candle_nn::rnn::{Direction, LSTMConfig, LSTMState, LSTM, RNN};
use candle_nn::{linear, ops, Linear, VarBuilder};

/// Stacked, optionally bidirectional LSTM over a single unbatched sequence.
///
/// Parameters follow the `weight_ih_l{k}[_reverse]` naming under one prefix.
#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    layers: Vec<Vec<LSTM>>,
    hidden: usize,
}

impl SequenceEncoder {
    pub fn load(
        vb: VarBuilder,
        n_in: usize,
        hidden: usize,
        n_layers: usize,
        bidirectional: bool,
    ) -> Result<Self> {
        if n_layers == 0 {
            bail!("the sequence encoder needs at least one layer");
        }
        let n_directions = if bidirectional { 2 } else { 1 };
        let mut layers = Vec::with_capacity(n_layers);
        for layer_idx in 0..n_layers {
            let layer_in = if layer_idx == 0 {
                n_in
            } else {
                hidden * n_directions
            };
            let mut cells = Vec::with_capacity(n_directions);
            for d in 0..n_directions {
                let config = LSTMConfig {
                    layer_idx,
                    direction: if d == 0 {
                        Direction::Forward
                    } else {
                        Direction::Backward
                    },
                    ..Default::default()
                };
                cells.push(candle_nn::rnn::lstm(layer_in, hidden, config, vb.clone())?);
            }
            layers.push(cells);
        }
        Ok(Self { layers, hidden })
    }

    pub fn n_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn n_directions(&self) -> usize {
        self.layers.first().map_or(1, |cells| cells.len())
    }

    pub fn hidden(&self) -> usize {
        self.hidden
    }

    /// All-zero initial states, one per layer and direction.
    pub fn zero_states(&self) -> Result<Vec<LSTMState>> {
        self.layers
            .iter()
            .flatten()
            .map(|cell| cell.zero_state(1))
            .collect()
    }

    /// `x` is `[n, n_in]`; returns `[n, directions * hidden]`.
    ///
    /// `init` holds one state per layer and direction, indexed `layer * directions + direction`.
    pub fn forward(&self, x: &Tensor, init: &[LSTMState]) -> Result<Tensor> {
        let dirs = self.n_directions();
        if init.len() != self.layers.len() * dirs {
            bail!(
                "expected {} initial states, got {}",
                self.layers.len() * dirs,
                init.len()
            );
        }
        let n = x.dim(0)?;
        let reversed = reverse_index(n, x.device())?;
        let mut input = x.unsqueeze(0)?;
        for (l, cells) in self.layers.iter().enumerate() {
            let mut outputs = Vec::with_capacity(dirs);
            for (d, cell) in cells.iter().enumerate() {
                let state = &init[l * dirs + d];
                let out = if d == 0 {
                    let states = cell.seq_init(&input, state)?;
                    cell.states_to_tensor(&states)?
                } else {
                    let flipped = input.index_select(&reversed, 1)?;
                    let states = cell.seq_init(&flipped, state)?;
                    cell.states_to_tensor(&states)?.index_select(&reversed, 1)?
                };
                outputs.push(out);
            }
            input = Tensor::cat(&outputs, 2)?;
        }
        input.squeeze(0)
    }
}

/// Gated sum over nodes, `sum_j sigmoid(W_g h_j) * (W_h h_j)`, split into LSTM states.
#[derive(Debug, Clone)]
pub struct GraphReadout {
    nodes2gating: Linear,
    nodes2graph: Linear,
}

impl GraphReadout {
    pub fn load(vb: VarBuilder, n_node_embed: usize, n_graph_embed: usize) -> Result<Self> {
        let nodes2gating = linear(n_node_embed, n_graph_embed, vb.pp("nodes2gating"))?;
        let nodes2graph = linear(n_node_embed, n_graph_embed, vb.pp("nodes2graph"))?;
        Ok(Self {
            nodes2gating,
            nodes2graph,
        })
    }

    /// Pooled graph embedding `[n_graph_embed]` of node embeddings `[M, n_node_embed]`.
    pub fn forward(&self, nodes: &Tensor) -> Result<Tensor> {
        let gate = ops::sigmoid(&self.nodes2gating.forward(nodes)?)?;
        let graph = self.nodes2graph.forward(nodes)?;
        (gate * graph)?.sum(0)
    }

    /// Initial states for `n_states` layer/direction pairs of width `hidden`.
    ///
    /// The first half of the embedding gives the hidden states, the second half the cells.
    pub fn initial_states(
        &self,
        nodes: &Tensor,
        n_states: usize,
        hidden: usize,
    ) -> Result<Vec<LSTMState>> {
        let pooled = self.forward(nodes)?.reshape((2, n_states, 1, hidden))?;
        let (h, c) = (pooled.get(0)?, pooled.get(1)?);
        (0..n_states)
            .map(|k| Ok(LSTMState::new(h.get(k)?, c.get(k)?)))
            .collect()
    }
}

fn reverse_index(n: usize, device: &Device) -> Result<Tensor> {
    let idx: Vec<u32> = (0..n as u32).rev().collect();
    Tensor::from_vec(idx, n, device)
}

/// Reverse the rows of a `[n, ...]` tensor.
pub fn reverse_rows(x: &Tensor) -> Result<Tensor> {
    let idx = reverse_index(x.dim(0)?, x.device())?;
    x.index_select(&idx, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::DType;
    use candle_nn::VarMap;

    fn vb(varmap: &VarMap) -> VarBuilder<'_> {
        VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu)
    }

    #[test]
    fn test_unidirectional_shapes() {
        let varmap = VarMap::new();
        let enc = SequenceEncoder::load(vb(&varmap).pp("lstm"), 6, 5, 2, false).unwrap();
        let x = Tensor::randn(0f32, 1.0, (7, 6), &Device::Cpu).unwrap();
        let init = enc.zero_states().unwrap();
        assert_eq!(init.len(), 2);
        assert_eq!(enc.forward(&x, &init).unwrap().dims(), &[7, 5]);
        let names = varmap.data().lock().unwrap();
        assert!(names.contains_key("lstm.weight_ih_l1"));
        assert!(!names.contains_key("lstm.weight_ih_l0_reverse"));
    }

    #[test]
    fn test_bidirectional_shapes() {
        let varmap = VarMap::new();
        let enc = SequenceEncoder::load(vb(&varmap).pp("lstm"), 6, 5, 2, true).unwrap();
        let x = Tensor::randn(0f32, 1.0, (3, 6), &Device::Cpu).unwrap();
        let init = enc.zero_states().unwrap();
        assert_eq!(init.len(), 4);
        assert_eq!(enc.forward(&x, &init).unwrap().dims(), &[3, 10]);
        assert!(varmap
            .data()
            .lock()
            .unwrap()
            .contains_key("lstm.weight_hh_l1_reverse"));
        assert!(enc.forward(&x, &init[..2]).is_err());
    }

    #[test]
    fn test_readout_states() {
        let varmap = VarMap::new();
        let readout = GraphReadout::load(vb(&varmap), 4, 2 * 3 * 5).unwrap();
        let nodes = Tensor::randn(0f32, 1.0, (9, 4), &Device::Cpu).unwrap();
        let states = readout.initial_states(&nodes, 3, 5).unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].h().dims(), &[1, 5]);
        assert_eq!(states[2].c().dims(), &[1, 5]);
    }

    #[test]
    fn test_reverse_rows() {
        let x = Tensor::new(&[[1f32, 2.], [3., 4.], [5., 6.]], &Device::Cpu).unwrap();
        assert_eq!(
            reverse_rows(&x).unwrap().to_vec2::<f32>().unwrap(),
            vec![vec![5., 6.], vec![3., 4.], vec![1., 2.]]
        );
    }
}
