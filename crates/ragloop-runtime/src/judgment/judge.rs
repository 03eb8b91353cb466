//! Policed access to the judgment service.

use ragloop_core::{Decision, Judgment};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::decode::{decode, DecodeError};
use super::JudgmentService;
use crate::error::RuntimeError;
use crate::providers::ProviderError;
use crate::resilience::{CallError, CallPolicy, Retryable, Service, UsageTracker};

/// Why a single structured attempt failed.
#[derive(Debug)]
enum AttemptError {
    Transport(ProviderError),
    Malformed(DecodeError),
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "{}", e),
            AttemptError::Malformed(e) => write!(f, "malformed judgment: {}", e),
        }
    }
}

impl Retryable for AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            AttemptError::Transport(e) => e.is_retryable(),
            AttemptError::Malformed(_) => true,
        }
    }

    // The service answered; it just answered badly.
    fn trips_circuit(&self) -> bool {
        matches!(self, AttemptError::Transport(_))
    }
}

/// Judgment service wrapped in the call policy.
///
/// Structured calls that keep returning malformed output resolve to the
/// decision's conservative value and are marked `defaulted`. Transport
/// failures surface as [`RuntimeError::ServiceUnavailable`].
#[derive(Clone)]
pub struct Judge {
    service: Arc<dyn JudgmentService>,
    policy: CallPolicy,
    usage: Arc<UsageTracker>,
}

impl Judge {
    pub fn new(service: Arc<dyn JudgmentService>, policy: CallPolicy, usage: Arc<UsageTracker>) -> Self {
        Self {
            service,
            policy,
            usage,
        }
    }

    /// Ask for a typed decision.
    pub async fn judge<T: Decision>(&self, instruction: &str, input: &str) -> Result<Judgment<T>, RuntimeError> {
        let kind = T::KIND;
        let service = &self.service;
        let usage = &self.usage;

        let result = self
            .policy
            .execute(Service::Judgment, || async move {
                let reply = service
                    .structured(kind, instruction, input)
                    .await
                    .map_err(AttemptError::Transport)?;
                usage.record_call(Some(kind), &reply.usage);
                decode::<T>(&reply.content).map_err(AttemptError::Malformed)
            })
            .await;

        match result {
            Ok(judgment) => Ok(judgment),
            Err(CallError::Failed(AttemptError::Malformed(e))) => {
                warn!(%kind, error = %e, "Judgment stayed malformed, using conservative default");
                self.usage.record_default(kind);
                Ok(Judgment::conservative())
            }
            Err(e) => Err(RuntimeError::unavailable(Service::Judgment, e)),
        }
    }

    /// Free-text call, e.g. drafting an answer.
    pub async fn generate(&self, instruction: Option<&str>, content: &str) -> Result<String, RuntimeError> {
        let service = &self.service;
        let usage = &self.usage;

        self.policy
            .execute(Service::Judgment, || async move {
                let reply = service.generate(instruction, content).await?;
                usage.record_call(None, &reply.usage);
                Ok::<_, ProviderError>(reply.content)
            })
            .await
            .map_err(|e| RuntimeError::unavailable(Service::Judgment, e))
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }
}

impl fmt::Debug for Judge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Judge")
            .field("service", &self.service.name())
            .field("policy", &self.policy)
            .finish()
    }
}
