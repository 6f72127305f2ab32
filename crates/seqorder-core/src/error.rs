use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeqOrderError {
    /// A one-letter or three-letter code with no entry in the residue table.
    #[error("unknown residue code: {0}")]
    UnknownResidue(String),

    /// A class id outside of `0..=20`.
    #[error("residue id {0} is outside the alphabet")]
    ResidueId(u32),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, SeqOrderError>;
