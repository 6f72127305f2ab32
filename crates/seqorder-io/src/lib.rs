//! # seqorder-io
//!
//! Readers and stores used by the dataset pipeline:
//!
//! * [`Corpus`]: tabular sequence corpus (`.csv` / `.parquet`) with length and `standard` filters
//! * [`BlobWriter`] / [`BlobStore`]: write-once, read-many keyed tensor store backed by safetensors
//!
mod blobstore;
mod corpus;

pub use self::blobstore::{blob_key, BlobStore, BlobWriter};
pub use self::corpus::{
    Corpus, CorpusRecord, COORDS_COLUMN, LEN_COLUMN, MASK_COLUMN, SEQ_COLUMN, STANDARD_COLUMN,
};
