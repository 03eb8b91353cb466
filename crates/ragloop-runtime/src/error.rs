//! Errors surfaced by the control loop.

use ragloop_core::StateError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::resilience::Service;

/// Failures that end a run without an answer.
///
/// Malformed judgments never appear here: they resolve to a conservative
/// default once retries are spent. An exhausted retry budget is a normal
/// termination, not an error.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A collaborator failed, timed out or had its circuit open after the
    /// call policy gave up.
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: Service, reason: String },

    #[error("Loop invariant violated: {0}")]
    State(#[from] StateError),

    #[error("Transition limit of {limit} reached before any answer was drafted")]
    TransitionLimit { limit: u32 },

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl RuntimeError {
    pub fn unavailable(service: Service, reason: impl std::fmt::Display) -> Self {
        RuntimeError::ServiceUnavailable {
            service,
            reason: reason.to_string(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RuntimeError::ServiceUnavailable { .. })
    }
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
