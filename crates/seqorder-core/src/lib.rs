//! # seqorder-core
//!
//! Residue tables and graph math shared by the seqorder crates.
//!
//! __seqorder-core__ provides:
//! * Encoding of amino acids (one-letter and three-letter codes) into class ids and back
//! * One-hot encoding of class id sequences
//! * Contact maps from CA coordinates, chain adjacency from shuffled position ids
//! * Symmetric degree normalization used by the graph convolution stack
//!
mod error;
mod graph;
mod residue;

pub use self::error::{Result, SeqOrderError};
pub use self::graph::{
    chain_adjacency, contact_map, degree_normalize, propagation_operator, DEFAULT_CONTACT_CUTOFF,
};
pub use self::residue::{
    decode, decode_sequence, encode1, encode3, encode_sequence, onehot, Residue, ALPHABET_SIZE,
    UNKNOWN_ID,
};
