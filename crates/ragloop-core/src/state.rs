//! Loop state threaded through the control loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::evidence::{EvidenceSet, PassageSource};
use crate::machine::Stage;
use crate::question::Question;

/// Invariant violations inside the control loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: Stage, to: Stage },

    #[error("Retry counter went backwards: {previous} -> {current}")]
    RetryCountRegressed { previous: u32, current: u32 },

    #[error("Transition limit of {limit} reached")]
    TransitionLimit { limit: u32 },

    #[error("No draft answer available for {stage}")]
    MissingDraft { stage: Stage },
}

/// The mutable record owned by one control-loop instance.
///
/// Created once per question and dropped when the loop terminates.
#[derive(Debug, Clone)]
pub struct LoopState {
    pub question: Question,

    pub evidence: EvidenceSet,

    pub needs_web_fallback: bool,

    pub draft_answer: Option<String>,

    retry_count: u32,

    pub max_retries: u32,
}

impl LoopState {
    pub fn new(question: Question, max_retries: u32) -> Self {
        Self {
            question,
            evidence: EvidenceSet::new(),
            needs_web_fallback: false,
            draft_answer: None,
            retry_count: 0,
            max_retries,
        }
    }

    /// Completed generation attempts (the loop step).
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Store a new draft and count the attempt. Returns the new count.
    pub fn record_generation(&mut self, draft: impl Into<String>) -> u32 {
        self.draft_answer = Some(draft.into());
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    /// True once `max_retries` regenerations have followed the first attempt.
    pub fn budget_exhausted(&self) -> bool {
        self.retry_count > self.max_retries
    }

    /// Replace the evidence set wholesale.
    pub fn replace_evidence(&mut self, evidence: EvidenceSet) {
        self.evidence = evidence;
    }

    /// The current draft, or an error naming the stage that needed it.
    pub fn require_draft(&self, stage: Stage) -> Result<&str, StateError> {
        self.draft_answer
            .as_deref()
            .ok_or(StateError::MissingDraft { stage })
    }

    /// Capture a read-only view of the state on entry to `stage`.
    pub fn snapshot(&self, stage: Stage) -> LoopSnapshot {
        LoopSnapshot {
            stage,
            question: self.question.text().to_string(),
            store_passages: self.evidence.count_from(PassageSource::Store),
            web_passages: self.evidence.count_from(PassageSource::Web),
            needs_web_fallback: self.needs_web_fallback,
            draft_answer: self.draft_answer.clone(),
            loop_step: self.retry_count,
            at: Utc::now(),
        }
    }
}

/// Progress event emitted after each state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopSnapshot {
    pub stage: Stage,

    pub question: String,

    pub store_passages: usize,

    pub web_passages: usize,

    pub needs_web_fallback: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_answer: Option<String>,

    pub loop_step: u32,

    pub at: DateTime<Utc>,
}
