use candle_core::{bail, Module, Result, Tensor};
use candle_nn::{linear_b, Linear, VarBuilder};
use seqorder_core::propagation_operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    /// `ReLU(Linear(P·X))`
    Hidden,
    /// `Linear(P·X)`
    Output,
}

#[derive(Debug, Clone)]
pub struct GraphConvLayer {
    linear: Linear,
    kind: LayerKind,
}

impl GraphConvLayer {
    pub fn load(
        vb: VarBuilder,
        n_in: usize,
        n_out: usize,
        bias: bool,
        kind: LayerKind,
    ) -> Result<Self> {
        let linear = linear_b(n_in, n_out, bias, vb)?;
        Ok(Self { linear, kind })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// One propagation step with the normalized operator `p`.
    pub fn forward(&self, p: &Tensor, x: &Tensor) -> Result<Tensor> {
        let x = self.linear.forward(&p.matmul(x)?)?;
        match self.kind {
            LayerKind::Hidden => x.relu(),
            LayerKind::Output => Ok(x),
        }
    }
}

/// Stack of graph convolutions over a dense adjacency.
#[derive(Debug, Clone)]
pub struct GraphConvolution {
    layers: Vec<GraphConvLayer>,
}

impl GraphConvolution {
    /// `n_layers` layers: the first maps `n_in -> n_hidden`, the last `n_hidden -> n_out`.
    /// A single layer maps `n_in -> n_out` directly.
    pub fn load(
        vb: VarBuilder,
        n_in: usize,
        n_hidden: usize,
        n_out: usize,
        n_layers: usize,
        bias: bool,
    ) -> Result<Self> {
        if n_layers == 0 {
            bail!("the graph convolution needs at least one layer");
        }
        log::debug!("GCN layers: {n_layers}");
        let vb = vb.pp("layers");
        let mut layers = Vec::with_capacity(n_layers);
        for l in 0..n_layers {
            let (kind, n_out) = if l + 1 == n_layers {
                (LayerKind::Output, n_out)
            } else {
                (LayerKind::Hidden, n_hidden)
            };
            let n_in = if l == 0 { n_in } else { n_hidden };
            layers.push(GraphConvLayer::load(vb.pp(l), n_in, n_out, bias, kind)?);
        }
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[GraphConvLayer] {
        &self.layers
    }

    /// `adjacency` and `degree` are `[M, M]`, `x` is `[M, n_in]`.
    pub fn forward(&self, adjacency: &Tensor, degree: &Tensor, x: &Tensor) -> Result<Tensor> {
        let p = propagation_operator(adjacency, degree)?;
        let mut x = x.clone();
        for layer in &self.layers {
            x = layer.forward(&p, &x)?;
        }
        Ok(x)
    }
}
