use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address of the HTTP server.
    pub bind: String,

    /// Directory holding `train.csv` and `test.csv`.
    pub data_dir: PathBuf,

    /// Forest artifact (`.json`, or `.json.gz`).
    pub model_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5001".to_string(),
            data_dir: PathBuf::from("data/processed"),
            model_path: PathBuf::from("models/rforest_hyp.json"),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        let cfg: Config =
            serde_json::from_str(&s).with_context(|| format!("parse config: {}", path.display()))?;
        Ok(cfg)
    }
}
