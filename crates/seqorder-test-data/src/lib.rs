//! seqorder-test-data
//!
//! Small corpora embedded in the crate for use in testing.
//!
//! The test files are represented as `TestFile` objects which package the raw binary data
//! and create temporary files for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use seqorder_test_data::TestFile;
/// let (corpus, _temp) = TestFile::corpus_standard().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// Eight records with a `standard` column; two of them are non-standard.
    /// Lengths: 5, 6, 4(non-standard), 7, 3, 6(non-standard), 5, 9.
    pub fn corpus_standard() -> Self {
        Self {
            filebinary: include_bytes!("../data/corpus/standard.csv"),
            suffix: "csv",
        }
    }
    /// Seven records with only `len` and `seq`; one lower-case sequence and one `X`.
    /// Lengths: 5, 6, 4, 7, 3, 6, 5.
    pub fn corpus_plain() -> Self {
        Self {
            filebinary: include_bytes!("../data/corpus/plain.csv"),
            suffix: "csv",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}
