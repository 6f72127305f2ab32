//! Keyed tensor blob store.
//!
//! Samples are written once as a single safetensors file, one entry per field and
//! sample index (`"{field}_{index}"`), then memory-mapped and read back per key.
use anyhow::{Context, Result};
use candle_core::safetensors::MmapedSafetensors;
use candle_core::{Device, Tensor};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Key of `field` for sample `index`.
pub fn blob_key(field: &str, index: usize) -> String {
    format!("{field}_{index}")
}

/// Single writer for a blob store file. Nothing hits the disk until [`BlobWriter::finish`].
///
/// A safetensors file is serialized in one go, so every inserted tensor stays in host
/// memory until then: building a store peaks at the size of the whole dataset, the same
/// as keeping it in memory. The saving comes afterwards, when readers map the file
/// instead of holding the samples.
pub struct BlobWriter {
    path: PathBuf,
    tensors: HashMap<String, Tensor>,
}

impl BlobWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating blob store directory {}", parent.display()))?;
            }
        }
        Ok(Self {
            path,
            tensors: HashMap::new(),
        })
    }

    pub fn insert(&mut self, field: &str, index: usize, tensor: &Tensor) -> Result<()> {
        // safetensors wants contiguous host memory
        let tensor = tensor.to_device(&Device::Cpu)?.contiguous()?;
        self.tensors.insert(blob_key(field, index), tensor);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn finish(self) -> Result<PathBuf> {
        candle_core::safetensors::save(&self.tensors, &self.path)
            .with_context(|| format!("writing blob store {}", self.path.display()))?;
        log::debug!(
            "wrote {} blobs to {}",
            self.tensors.len(),
            self.path.display()
        );
        Ok(self.path)
    }
}

/// Read-only, memory-mapped view of a blob store file.
pub struct BlobStore {
    path: PathBuf,
    inner: MmapedSafetensors,
}

impl BlobStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // The file is written once before opening and never modified while mapped.
        let inner = unsafe { MmapedSafetensors::new(&path) }
            .with_context(|| format!("opening blob store {}", path.display()))?;
        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, field: &str, index: usize) -> bool {
        self.inner.get(&blob_key(field, index)).is_ok()
    }

    pub fn get(&self, field: &str, index: usize, device: &Device) -> Result<Tensor> {
        let key = blob_key(field, index);
        self.inner
            .load(&key, device)
            .with_context(|| format!("missing blob `{key}` in {}", self.path.display()))
    }
}
