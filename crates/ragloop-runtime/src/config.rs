//! Runtime configuration.
//!
//! Every field has a default, so an empty document deserializes into a
//! working configuration. Durations are written as human strings
//! (`"30s"`, `"500ms"`, `"10m"`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::resilience::CircuitBreakerConfig;

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid configuration: {field} {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: &'static str,
}

/// Configuration for the control loop and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Regenerations allowed after the first attempt
    pub max_retries: u32,

    /// Passages requested from the evidence store
    pub store_top_k: usize,

    /// Snippets requested from web search
    pub web_top_k: usize,

    /// Relevance judgments in flight at once
    pub relevance_concurrency: usize,

    /// Reformulate the question before web search on a NotUseful verdict
    pub rewrite_on_not_useful: bool,

    /// What the evidence store covers; shown to the router
    pub store_domain: String,

    pub model: ModelConfig,

    pub calls: CallConfig,

    pub circuit_breaker: CircuitBreakerConfig,

    pub cache: CacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            store_top_k: 3,
            web_top_k: 3,
            relevance_concurrency: 4,
            rewrite_on_not_useful: false,
            store_domain: "documents related to TotalEnergies results in 2023".to_string(),
            model: ModelConfig::default(),
            calls: CallConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_top_k == 0 {
            return Err(ConfigError {
                field: "store_top_k",
                reason: "must be at least 1",
            });
        }
        if self.web_top_k == 0 {
            return Err(ConfigError {
                field: "web_top_k",
                reason: "must be at least 1",
            });
        }
        if self.relevance_concurrency == 0 {
            return Err(ConfigError {
                field: "relevance_concurrency",
                reason: "must be at least 1",
            });
        }
        if self.calls.timeout.is_zero() {
            return Err(ConfigError {
                field: "calls.timeout",
                reason: "must be non-zero",
            });
        }
        if self.model.model.trim().is_empty() {
            return Err(ConfigError {
                field: "model.model",
                reason: "must not be empty",
            });
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError {
                field: "model.temperature",
                reason: "must be between 0.0 and 2.0",
            });
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError {
                field: "cache.max_entries",
                reason: "must be at least 1 when the cache is enabled",
            });
        }
        Ok(())
    }
}

/// Model selection for judgment and generation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model: String,

    pub max_tokens: u32,

    /// Zero keeps judgments deterministic
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "llama3.2:3b-instruct-fp16".to_string(),
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Bounds applied to every external call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    #[serde(with = "duration_str")]
    pub timeout: Duration,

    /// Attempts after the first
    pub retries: u32,

    /// Delay before the first retry; doubles after that
    #[serde(with = "duration_str")]
    pub backoff: Duration,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Evidence-store result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    pub max_entries: u64,

    #[serde(with = "duration_str")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            ttl: Duration::from_secs(600),
        }
    }
}

pub(crate) mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RuntimeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.store_top_k, 3);
        assert_eq!(config.calls.retries, 1);
        assert_eq!(config.model.temperature, 0.0);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.web_top_k, 3);
        assert_eq!(config.calls.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_human_durations() {
        let config: RuntimeConfig = serde_json::from_str(
            r#"{"calls": {"timeout": "15s", "backoff": "250ms"}, "cache": {"ttl": "2m"}}"#,
        )
        .unwrap();

        assert_eq!(config.calls.timeout, Duration::from_secs(15));
        assert_eq!(config.calls.backoff, Duration::from_millis(250));
        assert_eq!(config.calls.retries, 1);
        assert_eq!(config.cache.ttl, Duration::from_secs(120));

        let json = serde_json::to_value(&config.calls).unwrap();
        assert_eq!(json["timeout"], "15s");
    }

    #[test]
    fn test_bad_duration_is_rejected() {
        let result: Result<RuntimeConfig, _> =
            serde_json::from_str(r#"{"calls": {"timeout": "soon"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = RuntimeConfig {
            store_top_k: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "store_top_k");

        let config = RuntimeConfig {
            relevance_concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "relevance_concurrency");

        let mut config = RuntimeConfig::default();
        config.calls.timeout = Duration::ZERO;
        assert_eq!(config.validate().unwrap_err().field, "calls.timeout");
    }
}
