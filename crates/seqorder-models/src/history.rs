use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRecord {
    /// 1-based.
    pub epoch: usize,
    /// 1-based position inside the epoch.
    pub iter: usize,
    pub seen: u64,
    pub loss: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValRecord {
    /// 0-based.
    pub epoch: usize,
    pub acc: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValSeenRecord {
    pub seen: u64,
    pub acc: f64,
}

/// Training log document, written once at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
    pub train: Vec<TrainRecord>,
    pub val: Vec<ValRecord>,
    pub val_seen: Vec<ValSeenRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl TrainingLog {
    /// Attach the run configuration.
    pub fn with_params<T: Serialize>(mut self, params: &T) -> Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing training log {}", path.display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading training log {}", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_keys() {
        let log = TrainingLog {
            train: vec![TrainRecord {
                epoch: 1,
                iter: 100,
                seen: 100,
                loss: 0.5,
            }],
            val: vec![ValRecord { epoch: 0, acc: 0.25 }],
            val_seen: vec![],
            params: None,
        }
        .with_params(&serde_json::json!({"lr": 0.01}))
        .unwrap();
        let value = serde_json::to_value(&log).unwrap();
        assert_eq!(value["train"][0]["iter"], 100);
        assert_eq!(value["val"][0]["epoch"], 0);
        assert!(value["val_seen"].as_array().unwrap().is_empty());
        assert_eq!(value["params"]["lr"], 0.01);
    }
}
