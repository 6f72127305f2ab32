//! Corpus record store.
//!
//! A tabular corpus of sequences with at least the columns `len` (int) and `seq`
//! (one-letter residue string). Optional columns:
//!
//! - `standard`: boolean inclusion flag, applied as a filter when present
//! - `CA_coors`: per-record CA coordinates, either nested (`list[list[f64]]`, N×3)
//!   or flat (`list[f64]`, 3N)
//! - `mask`: per-record `list[bool]` of valid positions
//!
use anyhow::{anyhow, bail, Context, Result};
use polars::prelude::*;
use rand::Rng;
use std::fs::File;
use std::path::Path;

pub const LEN_COLUMN: &str = "len";
pub const SEQ_COLUMN: &str = "seq";
pub const STANDARD_COLUMN: &str = "standard";
pub const COORDS_COLUMN: &str = "CA_coors";
pub const MASK_COLUMN: &str = "mask";

/// One materialized corpus row.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusRecord {
    pub len: usize,
    pub seq: String,
    pub ca_coords: Option<Vec<[f32; 3]>>,
    pub mask: Option<Vec<bool>>,
}

#[derive(Debug, Clone)]
pub struct Corpus {
    df: DataFrame,
}

impl Corpus {
    /// Read a corpus from a `.csv` or `.parquet` file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        let df = match extension.as_deref() {
            Some("csv") => CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?,
            Some("parquet") | Some("pq") => {
                let file = File::open(path)
                    .with_context(|| format!("opening corpus {}", path.display()))?;
                ParquetReader::new(file).finish()?
            }
            _ => bail!(
                "unsupported corpus format for {}: expected .csv or .parquet",
                path.display()
            ),
        };
        Self::from_dataframe(df)
    }

    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        for required in [LEN_COLUMN, SEQ_COLUMN] {
            if df.get_column_index(required).is_none() {
                bail!("corpus is missing the `{required}` column");
            }
        }
        Ok(Self { df })
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_index(name).is_some()
    }

    pub fn has_coordinates(&self) -> bool {
        self.has_column(COORDS_COLUMN)
    }

    pub fn lengths(&self) -> Result<Vec<i64>> {
        let lens = self
            .df
            .column(LEN_COLUMN)?
            .as_materialized_series()
            .cast(&DataType::Int64)?;
        Ok(lens.i64()?.into_iter().map(|l| l.unwrap_or(0)).collect())
    }

    /// Keep the rows with `min_len <= len < max_len`.
    pub fn filter_length(self, min_len: usize, max_len: usize) -> Result<Self> {
        let keep: Vec<bool> = self
            .lengths()?
            .into_iter()
            .map(|l| l >= min_len as i64 && l < max_len as i64)
            .collect();
        self.filter(keep)
    }

    /// Keep the rows flagged `standard`. A corpus without that column is returned unchanged.
    pub fn filter_standard(self) -> Result<Self> {
        if !self.has_column(STANDARD_COLUMN) {
            return Ok(self);
        }
        let flags = self
            .df
            .column(STANDARD_COLUMN)?
            .as_materialized_series()
            .cast(&DataType::Boolean)?;
        let keep: Vec<bool> = flags
            .bool()?
            .into_iter()
            .map(|f| f.unwrap_or(false))
            .collect();
        self.filter(keep)
    }

    /// Random subsample of `n` rows without replacement. `n` is clamped to the corpus size.
    pub fn sample<R: Rng + ?Sized>(self, n: usize, rng: &mut R) -> Result<Self> {
        let n = n.min(self.len());
        let picks: Vec<IdxSize> = rand::seq::index::sample(rng, self.len(), n)
            .into_iter()
            .map(|i| i as IdxSize)
            .collect();
        let idx = IdxCa::from_vec("idx".into(), picks);
        Ok(Self {
            df: self.df.take(&idx)?,
        })
    }

    fn filter(self, keep: Vec<bool>) -> Result<Self> {
        let keep = Series::new("keep".into(), keep);
        Ok(Self {
            df: self.df.filter(keep.bool()?)?,
        })
    }

    /// Materialize every row.
    pub fn records(&self) -> Result<Vec<CorpusRecord>> {
        let lens = self.lengths()?;
        let seqs = self.df.column(SEQ_COLUMN)?.as_materialized_series().clone();
        let seqs: Vec<String> = seqs
            .str()?
            .into_iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect();

        let coords: Option<Vec<Option<Vec<[f32; 3]>>>> = if self.has_coordinates() {
            let column = self.df.column(COORDS_COLUMN)?.as_materialized_series();
            Some(
                column
                    .list()?
                    .into_iter()
                    .map(|row| row.map(|s| coords_from_series(&s)).transpose())
                    .collect::<Result<_>>()?,
            )
        } else {
            None
        };

        let masks: Option<Vec<Option<Vec<bool>>>> = if self.has_column(MASK_COLUMN) {
            let column = self.df.column(MASK_COLUMN)?.as_materialized_series();
            Some(
                column
                    .list()?
                    .into_iter()
                    .map(|row| row.map(|s| mask_from_series(&s)).transpose())
                    .collect::<Result<_>>()?,
            )
        } else {
            None
        };

        let mut records = Vec::with_capacity(self.len());
        for (row, (len, seq)) in lens.into_iter().zip(seqs).enumerate() {
            let len = usize::try_from(len).map_err(|_| anyhow!("row {row}: negative len"))?;
            let ca_coords = coords.as_ref().and_then(|c| c[row].clone());
            let mask = masks.as_ref().and_then(|m| m[row].clone());
            records.push(CorpusRecord {
                len,
                seq,
                ca_coords,
                mask,
            });
        }
        Ok(records)
    }
}

fn coords_from_series(series: &Series) -> Result<Vec<[f32; 3]>> {
    let flat = match series.dtype() {
        DataType::List(_) => series.explode()?,
        _ => series.clone(),
    };
    let values: Vec<f32> = flat
        .cast(&DataType::Float32)?
        .f32()?
        .into_iter()
        .map(|v| v.unwrap_or(f32::NAN))
        .collect();
    if values.len() % 3 != 0 {
        bail!("CA coordinates must hold 3 values per residue, got {}", values.len());
    }
    Ok(values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

fn mask_from_series(series: &Series) -> Result<Vec<bool>> {
    Ok(series
        .cast(&DataType::Boolean)?
        .bool()?
        .into_iter()
        .map(|v| v.unwrap_or(false))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn coords_frame() -> DataFrame {
        let coords = Series::new(
            COORDS_COLUMN.into(),
            &[
                Series::new("".into(), &[0.0f64, 0.0, 0.0, 100.0, 0.0, 0.0, 900.0, 0.0, 0.0]),
                Series::new("".into(), &[0.0f64, 0.0, 0.0, 1.0, 1.0, 1.0]),
            ],
        );
        let mask = Series::new(
            MASK_COLUMN.into(),
            &[
                Series::new("".into(), &[true, true, false]),
                Series::new("".into(), &[true, true]),
            ],
        );
        DataFrame::new(vec![
            Series::new(LEN_COLUMN.into(), &[3i64, 2]).into(),
            Series::new(SEQ_COLUMN.into(), &["MKV", "GA"]).into(),
            coords.into(),
            mask.into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_records_with_coordinates() {
        let corpus = Corpus::from_dataframe(coords_frame()).unwrap();
        assert!(corpus.has_coordinates());
        let records = corpus.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len, 3);
        assert_eq!(records[0].seq, "MKV");
        let xyz = records[0].ca_coords.as_ref().unwrap();
        assert_eq!(xyz.len(), 3);
        assert_eq!(xyz[1], [100.0, 0.0, 0.0]);
        assert_eq!(records[0].mask, Some(vec![true, true, false]));
        assert_eq!(records[1].ca_coords.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_required_column() {
        let df = DataFrame::new(vec![Series::new(LEN_COLUMN.into(), &[3i64]).into()]).unwrap();
        assert!(Corpus::from_dataframe(df).is_err());
    }

    #[test]
    fn test_sample_is_seeded() {
        let corpus = Corpus::from_dataframe(coords_frame()).unwrap();
        let a = corpus
            .clone()
            .sample(1, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .records()
            .unwrap();
        let b = corpus
            .sample(1, &mut StdRng::seed_from_u64(3))
            .unwrap()
            .records()
            .unwrap();
        assert_eq!(a, b);
    }
}
