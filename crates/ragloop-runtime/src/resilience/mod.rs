//! Resilience patterns for ragloop-runtime.
//!
//! This module provides:
//! - Circuit breaker to prevent cascade failures
//! - Bounded call execution (timeout, retry with backoff)
//! - Model usage accounting

mod call;
mod circuit_breaker;
mod usage;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use call::{CallError, CallPolicy, Retryable};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use usage::{LlmUsage, UsageTracker};

/// External collaborators the loop depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    EvidenceStore,
    WebSearch,
    Judgment,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::EvidenceStore => "evidence_store",
            Service::WebSearch => "web_search",
            Service::Judgment => "judgment",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
