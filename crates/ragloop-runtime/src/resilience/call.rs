//! Bounded execution of external calls.
//!
//! Every call to a collaborator goes through [`CallPolicy::execute`]:
//! circuit check, per-call timeout, bounded retry with exponential backoff,
//! and success/failure bookkeeping on the run's circuit for the service.

use backon::{ExponentialBuilder, Retryable as _};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use super::{CircuitBreaker, Service};
use crate::config::CallConfig;

/// Classifies errors for the retry loop and the circuit breaker.
pub trait Retryable {
    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool {
        true
    }

    /// Whether the failure says something about the service's health.
    fn trips_circuit(&self) -> bool {
        true
    }
}

/// Failure of a policed call after the policy has given up.
#[derive(Error, Debug)]
pub enum CallError<E> {
    #[error("{service} circuit is open")]
    CircuitOpen { service: Service },

    #[error("{service} call timed out after {timeout:?}")]
    Timeout { service: Service, timeout: Duration },

    #[error("{0}")]
    Failed(E),
}

impl<E: Retryable> CallError<E> {
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::CircuitOpen { .. } => false,
            CallError::Timeout { .. } => true,
            CallError::Failed(e) => e.is_retryable(),
        }
    }
}

/// Timeout, retry and circuit policy shared by the stages of one run.
#[derive(Clone)]
pub struct CallPolicy {
    config: CallConfig,
    breaker: Arc<CircuitBreaker>,
}

impl CallPolicy {
    pub fn new(config: CallConfig, breaker: Arc<CircuitBreaker>) -> Self {
        Self { config, breaker }
    }

    /// Run `op` under the policy.
    ///
    /// `op` is invoked once per attempt and must be idempotent.
    pub async fn execute<T, E, F, Fut>(&self, service: Service, mut op: F) -> Result<T, CallError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let timeout = self.config.timeout;
        let breaker = &self.breaker;

        let attempt = || {
            let fut = op();
            async move {
                if breaker.is_open(service) {
                    return Err(CallError::CircuitOpen { service });
                }

                match tokio::time::timeout(timeout, fut).await {
                    Ok(Ok(value)) => {
                        breaker.record_success(service);
                        Ok(value)
                    }
                    Ok(Err(e)) => {
                        if e.trips_circuit() {
                            breaker.record_failure(service);
                        }
                        Err(CallError::Failed(e))
                    }
                    Err(_) => {
                        breaker.record_failure(service);
                        Err(CallError::Timeout { service, timeout })
                    }
                }
            }
        };

        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.config.backoff)
            .with_max_times(self.config.retries as usize);

        attempt
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(|e: &CallError<E>| e.is_retryable())
            .notify(|e: &CallError<E>, delay: Duration| {
                warn!(%service, error = %e, ?delay, "Call failed, retrying");
            })
            .await
    }
}

impl fmt::Debug for CallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallPolicy")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
