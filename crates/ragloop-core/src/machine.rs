//! Control-loop state machine.
//!
//! ```text
//! Routing ──WebSearch──────────────────────────┐
//!    │ EvidenceStore                           ▼
//!    ▼                                    WebFallback ◄──NotUseful──┐
//! Retrieving ─► Filtering ──needs_fallback──►  │                    │
//!                   │ !needs_fallback          ▼                    │
//!                   └────────────────────► Generating ◄─NotGrounded─┤
//!                                              │                    │
//!                                              ▼                    │
//!                                           Grading ────────────────┘
//!                                              │ UsefulAndGrounded | MaxRetriesExceeded
//!                                              ▼
//!                                             Done
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::judgment::RouteDecision;
use crate::state::StateError;
use crate::verdict::Verdict;

/// States of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Routing,
    Retrieving,
    Filtering,
    WebFallback,
    Generating,
    Grading,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Routing => "routing",
            Stage::Retrieving => "retrieving",
            Stage::Filtering => "filtering",
            Stage::WebFallback => "web_fallback",
            Stage::Generating => "generating",
            Stage::Grading => "grading",
            Stage::Done => "done",
        }
    }

    /// Whether the machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Routing, WebFallback)
                | (Routing, Retrieving)
                | (Retrieving, Filtering)
                | (Filtering, Generating)
                | (Filtering, WebFallback)
                | (WebFallback, Generating)
                | (Generating, Grading)
                | (Grading, Done)
                | (Grading, Generating)
                | (Grading, WebFallback)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next stage after routing.
pub fn after_routing(decision: RouteDecision) -> Stage {
    match decision {
        RouteDecision::WebSearch => Stage::WebFallback,
        RouteDecision::EvidenceStore => Stage::Retrieving,
    }
}

/// Next stage after relevance filtering.
pub fn after_filtering(needs_fallback: bool) -> Stage {
    if needs_fallback {
        Stage::WebFallback
    } else {
        Stage::Generating
    }
}

/// Next stage after grading a draft.
pub fn after_grading(verdict: Verdict) -> Stage {
    match verdict {
        Verdict::UsefulAndGrounded | Verdict::MaxRetriesExceeded => Stage::Done,
        Verdict::NotGrounded => Stage::Generating,
        Verdict::NotUseful => Stage::WebFallback,
    }
}

/// Caps the number of transitions one loop may take.
///
/// Holds independently of the retry counter: even if some path fails to
/// count a generation, the loop cannot run unbounded.
#[derive(Debug, Clone)]
pub struct TransitionGuard {
    limit: u32,
    taken: u32,
    last_retry_count: u32,
}

impl TransitionGuard {
    /// Guard sized for a retry budget.
    ///
    /// The longest legal path is five transitions to the first grading,
    /// three per retry cycle, and one into `Done`; the limit leaves slack
    /// above that.
    pub fn for_budget(max_retries: u32) -> Self {
        let cycles = max_retries.saturating_add(1);
        Self::with_limit(cycles.saturating_mul(3).saturating_add(8))
    }

    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            taken: 0,
            last_retry_count: 0,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn taken(&self) -> u32 {
        self.taken
    }

    /// Validate and record one transition.
    pub fn advance(&mut self, from: Stage, to: Stage, retry_count: u32) -> Result<(), StateError> {
        if !from.can_transition_to(to) {
            return Err(StateError::IllegalTransition { from, to });
        }

        if retry_count < self.last_retry_count {
            return Err(StateError::RetryCountRegressed {
                previous: self.last_retry_count,
                current: retry_count,
            });
        }

        if self.taken >= self.limit {
            return Err(StateError::TransitionLimit { limit: self.limit });
        }

        self.taken += 1;
        self.last_retry_count = retry_count;
        tracing::trace!(%from, %to, taken = self.taken, limit = self.limit, "transition");
        Ok(())
    }
}
