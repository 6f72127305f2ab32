//! Graph Construction
//!
//! Adjacency matrices for a set of residue nodes and the symmetric
//! normalization `D·A·D` consumed by the graph convolution stack.
//! All matrices are dense `f32` tensors with 0/1 entries.
use candle_core::{bail, DType, Device, Result, Tensor, D};
use itertools::iproduct;

/// Distance cutoff used for contact maps built from CA coordinates scaled by 0.01.
pub const DEFAULT_CONTACT_CUTOFF: f64 = 4.0;

/// Contact map from `[N, 3]` coordinates.
///
/// Two nodes are in contact when their Euclidean distance is strictly below `cutoff`.
/// A node whose `mask` entry is `false` is disconnected from every other node but
/// keeps its self-loop.
pub fn contact_map(coords: &Tensor, mask: Option<&[bool]>, cutoff: f64) -> Result<Tensor> {
    let (n, dim3) = coords.dims2()?;
    if dim3 != 3 {
        bail!("contact_map expects [N, 3] coordinates, got {:?}", coords.dims());
    }
    if let Some(mask) = mask {
        if mask.len() != n {
            bail!("mask has {} entries for {} coordinates", mask.len(), n);
        }
    }
    let coords = coords.to_dtype(DType::F32)?;
    let dist2 = coords
        .unsqueeze(1)?
        .broadcast_sub(&coords.unsqueeze(0)?)?
        .sqr()?
        .sum(D::Minus1)?
        .to_vec2::<f32>()?;

    let cutoff2 = (cutoff * cutoff) as f32;
    let valid = |i: usize| mask.map_or(true, |m| m[i]);
    let mut data = vec![0f32; n * n];
    for (i, j) in iproduct!(0..n, 0..n) {
        let connected = if valid(i) && valid(j) {
            dist2[i][j] < cutoff2
        } else {
            i == j
        };
        if connected {
            data[i * n + j] = 1.0;
        }
    }
    log::debug!(
        "{} contacts in the {n}x{n} contact map",
        data.iter().sum::<f32>() as usize - n
    );
    Tensor::from_vec(data, (n, n), coords.device())
}

/// Adjacency connecting positions whose ids differ by exactly one.
pub fn chain_adjacency(position_ids: &[i64], self_loop: bool, device: &Device) -> Result<Tensor> {
    let n = position_ids.len();
    let mut data = vec![0f32; n * n];
    for (i, j) in iproduct!(0..n, 0..n) {
        if (position_ids[i] - position_ids[j]).abs() == 1 {
            data[i * n + j] = 1.0;
        }
    }
    if self_loop {
        for i in 0..n {
            data[i * n + i] += 1.0;
        }
    }
    Tensor::from_vec(data, (n, n), device)
}

/// Diagonal matrix with `D_ii = deg(i)^(-1/2)`.
///
/// Isolated nodes (zero row sum) get `D_ii = 0`, so they contribute nothing
/// to `D·A·D` instead of poisoning it with infinities.
pub fn degree_normalize(adjacency: &Tensor) -> Result<Tensor> {
    let (n, m) = adjacency.dims2()?;
    if n != m {
        bail!("adjacency must be square, got {n}x{m}");
    }
    let degrees = adjacency.to_dtype(DType::F32)?.sum(1)?.to_vec1::<f32>()?;
    let mut data = vec![0f32; n * n];
    for (i, deg) in degrees.iter().enumerate() {
        if *deg > 0.0 {
            data[i * n + i] = deg.powf(-0.5);
        }
    }
    Tensor::from_vec(data, (n, n), adjacency.device())
}

/// Normalized propagation operator `P = D·A·D`.
pub fn propagation_operator(adjacency: &Tensor, degree: &Tensor) -> Result<Tensor> {
    degree.matmul(adjacency)?.matmul(degree)
}
