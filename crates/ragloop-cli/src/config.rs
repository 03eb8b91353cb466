//! YAML configuration for the `ragloop` binary.
//!
//! ```yaml
//! runtime:
//!   max_retries: 3
//!   calls:
//!     timeout: 20s
//! provider:
//!   type: ollama
//!   base_url: http://localhost:11434
//! web:
//!   search_depth: basic
//! corpus:
//!   path: ./corpus.json
//! ```

use anyhow::{Context, Result};
use ragloop_runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub runtime: RuntimeConfig,

    /// Handed to the provider registry; must carry a `type`
    pub provider: JsonValue,

    /// Tavily settings; the API key may come from `TAVILY_API_KEY`
    pub web: JsonValue,

    pub corpus: CorpusConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            runtime: RuntimeConfig::default(),
            provider: serde_json::json!({ "type": "ollama" }),
            web: serde_json::json!({}),
            corpus: CorpusConfig::default(),
        }
    }
}

/// Passages for the in-memory evidence store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// JSON array of `{"id", "text"}` objects
    pub path: Option<PathBuf>,
}

impl CliConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CliConfig = serde_yaml::from_str(yaml).context("Failed to parse config YAML")?;
        Ok(config)
    }

    /// Load from a file, resolving a relative corpus path against the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_yaml(&yaml)?;

        if let (Some(corpus), Some(dir)) = (config.corpus.path.as_mut(), path.parent()) {
            if corpus.is_relative() {
                *corpus = dir.join(&*corpus);
            }
        }
        Ok(config)
    }
}
