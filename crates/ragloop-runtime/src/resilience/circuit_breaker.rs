//! Run-scoped circuit breaker.
//!
//! Every run gets fresh circuits, one per collaborator. Once a service has
//! failed `failure_threshold` attempts in a row within the run, the rest of
//! the run's calls to it fail fast instead of waiting out more timeouts.
//! A successful attempt closes the circuit again.
//!
//! Nothing carries over between runs: a later run always makes its own
//! attempts, whatever happened to earlier ones.

use parking_lot::Mutex;
use std::collections::HashMap;

use super::Service;

/// Circuit breaker configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed attempts before a service is cut off for the
    /// rest of the run; 0 disables the breaker
    pub failure_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 3 }
    }
}

/// State of one service's circuit within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed { consecutive_failures: u32 },
    Open,
}

/// Per-service failure streaks for a single run.
#[derive(Debug)]
pub struct CircuitBreaker {
    streaks: Mutex<HashMap<Service, u32>>,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            streaks: Mutex::new(HashMap::new()),
            threshold: config.failure_threshold,
        }
    }

    /// Returns true if calls to `service` should fail fast.
    pub fn is_open(&self, service: Service) -> bool {
        self.state(service) == CircuitState::Open
    }

    pub fn state(&self, service: Service) -> CircuitState {
        let failures = self.streaks.lock().get(&service).copied().unwrap_or(0);
        if self.threshold > 0 && failures >= self.threshold {
            CircuitState::Open
        } else {
            CircuitState::Closed {
                consecutive_failures: failures,
            }
        }
    }

    pub fn record_success(&self, service: Service) {
        if let Some(failures) = self.streaks.lock().remove(&service) {
            tracing::debug!(%service, failures, "Failure streak ended");
        }
    }

    pub fn record_failure(&self, service: Service) {
        let mut streaks = self.streaks.lock();
        let failures = streaks.entry(service).or_insert(0);
        *failures = failures.saturating_add(1);

        if self.threshold > 0 && *failures == self.threshold {
            tracing::warn!(
                %service,
                failures = *failures,
                "Circuit opened, failing fast for the rest of this run"
            );
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(&CircuitBreakerConfig::default())
    }
}
