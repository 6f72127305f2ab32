//! Model checkpoints: all parameters plus the processed-sample counter in one safetensors file.
use candle_core::{Device, Result, Tensor};
use candle_nn::VarMap;
use std::collections::HashMap;
use std::path::Path;

/// Key of the processed-sample counter.
pub const SEEN_KEY: &str = "training.seen";

pub fn save_checkpoint<P: AsRef<Path>>(varmap: &VarMap, seen: u64, path: P) -> Result<()> {
    let mut tensors: HashMap<String, Tensor> = HashMap::new();
    {
        let vars = varmap
            .data()
            .lock()
            .map_err(|_| candle_core::Error::Msg("parameter map lock poisoned".to_string()))?;
        for (name, var) in vars.iter() {
            tensors.insert(name.clone(), var.as_tensor().clone());
        }
    }
    tensors.insert(
        SEEN_KEY.to_string(),
        Tensor::new(&[seen as i64], &Device::Cpu)?,
    );
    candle_core::safetensors::save(&tensors, path.as_ref())?;
    log::debug!(
        "saved {} parameters to {}",
        tensors.len() - 1,
        path.as_ref().display()
    );
    Ok(())
}

/// Restore every parameter of `varmap` from `path` and return the stored counter.
///
/// Fails when a parameter is missing, its shape differs, or the file holds parameters
/// the model does not have.
pub fn load_checkpoint<P: AsRef<Path>>(varmap: &mut VarMap, path: P) -> Result<u64> {
    let path = path.as_ref();
    varmap.load(path)?;
    let tensors = candle_core::safetensors::load(path, &Device::Cpu)?;
    {
        let vars = varmap
            .data()
            .lock()
            .map_err(|_| candle_core::Error::Msg("parameter map lock poisoned".to_string()))?;
        let mut unexpected: Vec<&String> = tensors
            .keys()
            .filter(|name| name.as_str() != SEEN_KEY && !vars.contains_key(name.as_str()))
            .collect();
        if !unexpected.is_empty() {
            unexpected.sort();
            candle_core::bail!(
                "{} holds parameters this model does not have: {unexpected:?}",
                path.display()
            );
        }
    }
    let seen = match tensors.get(SEEN_KEY) {
        Some(seen) => seen.to_vec1::<i64>()?.first().copied().unwrap_or(0).max(0) as u64,
        None => {
            log::warn!("{} has no sample counter, starting from 0", path.display());
            0
        }
    };
    Ok(seen)
}
