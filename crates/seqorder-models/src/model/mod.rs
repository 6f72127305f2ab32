//! Graph convolution + LSTM ordering model.
//!
//! Node features are embedded and propagated over the graph, the ground-truth residue
//! sequence runs through an LSTM, and every (position, node) pair is scored. The
//! predicted order is the greedy per-row argmax of those scores.
mod gcn;
mod init;
mod recurrent;
mod scoring;

pub use gcn::{GraphConvLayer, GraphConvolution, LayerKind};
pub use init::seed_parameters;
pub use recurrent::{reverse_rows, GraphReadout, SequenceEncoder};
pub use scoring::{greedy_order, PairwiseScorer};

use candle_core::{Device, Module, Result, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use serde::{Deserialize, Serialize};
use seqorder_core::ALPHABET_SIZE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub n_feat: usize,
    pub n_node_embed: usize,
    pub n_lstm_hidden: usize,
    pub n_seq_embed: usize,
    pub n_seq_alphabet: usize,
    pub n_graph_layers: usize,
    pub n_lstm_layers: usize,
    pub bidirectional: bool,
    /// Initialize the LSTM state from a pooled graph embedding instead of zeros.
    pub graph_to_lstm: bool,
    pub gcn_bias: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_feat: ALPHABET_SIZE,
            n_node_embed: 64,
            n_lstm_hidden: 128,
            n_seq_embed: 32,
            n_seq_alphabet: ALPHABET_SIZE,
            n_graph_layers: 1,
            n_lstm_layers: 1,
            bidirectional: false,
            graph_to_lstm: false,
            gcn_bias: true,
        }
    }
}

impl ModelConfig {
    pub fn n_directions(&self) -> usize {
        if self.bidirectional {
            2
        } else {
            1
        }
    }

    /// Width of the pooled graph embedding: hidden and cell state for every layer and direction.
    pub fn n_graph_embed(&self) -> usize {
        2 * self.n_lstm_hidden * self.n_lstm_layers * self.n_directions()
    }
}

#[derive(Debug, Clone)]
pub struct OrderingOutput {
    /// `[seq_len, M]`
    pub scores: Tensor,
    /// Predicted slot per sequence position.
    pub order: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct OrderingModel {
    config: ModelConfig,
    device: Device,
    seq2embed: Linear,
    feat2embed: Linear,
    gcn: GraphConvolution,
    encoder: SequenceEncoder,
    readout: Option<GraphReadout>,
    scorer: PairwiseScorer,
}

impl OrderingModel {
    pub fn load(vb: VarBuilder, config: &ModelConfig) -> Result<Self> {
        let seq2embed = linear(config.n_seq_alphabet, config.n_seq_embed, vb.pp("seq2embed"))?;
        let feat2embed = linear(config.n_feat, config.n_node_embed, vb.pp("feat2embed"))?;
        let gcn = GraphConvolution::load(
            vb.pp("gcn"),
            config.n_node_embed,
            config.n_node_embed,
            config.n_node_embed,
            config.n_graph_layers,
            config.gcn_bias,
        )?;
        let encoder = SequenceEncoder::load(
            vb.pp("lstm"),
            config.n_seq_embed,
            config.n_lstm_hidden,
            config.n_lstm_layers,
            config.bidirectional,
        )?;
        let readout = if config.graph_to_lstm {
            Some(GraphReadout::load(
                vb.clone(),
                config.n_node_embed,
                config.n_graph_embed(),
            )?)
        } else {
            None
        };
        let scorer = PairwiseScorer::load(
            vb.clone(),
            config.n_node_embed,
            config.n_directions() * config.n_lstm_hidden,
        )?;
        Ok(Self {
            config: config.clone(),
            device: vb.device().clone(),
            seq2embed,
            feat2embed,
            gcn,
            encoder,
            readout,
            scorer,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Score matrix `[n, M]` for a one-hot sequence `[n, 20]`, features `[M, 20]`,
    /// adjacency `[M, M]` and degree normalization `[M, M]`.
    pub fn scores(
        &self,
        sequence: &Tensor,
        features: &Tensor,
        adjacency: &Tensor,
        degree: &Tensor,
    ) -> Result<Tensor> {
        let seq_embed = self.seq2embed.forward(sequence)?;
        let nodes = self.feat2embed.forward(features)?.relu()?;
        let nodes = self.gcn.forward(adjacency, degree, &nodes)?;
        let init = match &self.readout {
            Some(readout) => readout.initial_states(
                &nodes,
                self.encoder.n_layers() * self.encoder.n_directions(),
                self.encoder.hidden(),
            )?,
            None => self.encoder.zero_states()?,
        };
        let lstm_out = self.encoder.forward(&seq_embed, &init)?;
        self.scorer.forward(&nodes, &lstm_out)
    }

    pub fn forward(
        &self,
        sequence: &Tensor,
        features: &Tensor,
        adjacency: &Tensor,
        degree: &Tensor,
    ) -> Result<OrderingOutput> {
        let scores = self.scores(sequence, features, adjacency, degree)?;
        let order = greedy_order(&scores)?;
        Ok(OrderingOutput { scores, order })
    }

    /// Like [`forward`](Self::forward), with the scores cut from the parameter graph.
    pub fn infer(
        &self,
        sequence: &Tensor,
        features: &Tensor,
        adjacency: &Tensor,
        degree: &Tensor,
    ) -> Result<OrderingOutput> {
        let scores = self.scores(sequence, features, adjacency, degree)?.detach();
        let order = greedy_order(&scores)?;
        Ok(OrderingOutput { scores, order })
    }
}
