//! Answer quality gate: combines grounding and usefulness into a verdict.
//!
//! The gate applies strict, non-configurable precedence:
//! 1. If the retry budget is exhausted → `MaxRetriesExceeded`
//! 2. Else if the draft is not grounded → `NotGrounded`
//! 3. Else if the draft is not useful → `NotUseful`
//! 4. Else → `UsefulAndGrounded`
//!
//! A missing grade is read as its conservative value.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::judgment::{GroundingVerdict, UsefulnessVerdict};

/// Outcome of grading a draft answer. Drives the grading transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NotGrounded,
    UsefulAndGrounded,
    NotUseful,
    MaxRetriesExceeded,
}

impl Verdict {
    /// True for verdicts that end the loop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Verdict::UsefulAndGrounded | Verdict::MaxRetriesExceeded)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::NotGrounded => "not grounded",
            Verdict::UsefulAndGrounded => "useful and grounded",
            Verdict::NotUseful => "not useful",
            Verdict::MaxRetriesExceeded => "max retries exceeded",
        };
        f.write_str(s)
    }
}

/// The decision table for draft answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGate;

impl QualityGate {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a verdict.
    ///
    /// `usefulness` is only consulted when the draft is grounded; callers
    /// skip the usefulness call otherwise and pass `None`.
    pub fn decide(
        &self,
        budget_exhausted: bool,
        grounding: Option<GroundingVerdict>,
        usefulness: Option<UsefulnessVerdict>,
    ) -> Verdict {
        if budget_exhausted {
            return Verdict::MaxRetriesExceeded;
        }

        match grounding.unwrap_or(GroundingVerdict::NotGrounded) {
            GroundingVerdict::NotGrounded => Verdict::NotGrounded,
            GroundingVerdict::Grounded => match usefulness.unwrap_or(UsefulnessVerdict::NotUseful) {
                UsefulnessVerdict::NotUseful => Verdict::NotUseful,
                UsefulnessVerdict::Useful => Verdict::UsefulAndGrounded,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use GroundingVerdict::*;
    use UsefulnessVerdict::*;

    #[test]
    fn test_decision_table() {
        let gate = QualityGate::new();

        // Budget check wins regardless of grades
        for grounding in [None, Some(Grounded), Some(NotGrounded)] {
            for usefulness in [None, Some(Useful), Some(NotUseful)] {
                assert_eq!(
                    gate.decide(true, grounding, usefulness),
                    Verdict::MaxRetriesExceeded
                );
            }
        }

        assert_eq!(gate.decide(false, Some(NotGrounded), Some(Useful)), Verdict::NotGrounded);
        assert_eq!(gate.decide(false, Some(Grounded), Some(NotUseful)), Verdict::NotUseful);
        assert_eq!(
            gate.decide(false, Some(Grounded), Some(Useful)),
            Verdict::UsefulAndGrounded
        );
    }

    #[test]
    fn test_missing_grades_are_conservative() {
        let gate = QualityGate::new();
        assert_eq!(gate.decide(false, None, Some(Useful)), Verdict::NotGrounded);
        assert_eq!(gate.decide(false, Some(Grounded), None), Verdict::NotUseful);
    }

    #[test]
    fn test_terminal_verdicts() {
        assert!(Verdict::UsefulAndGrounded.is_terminal());
        assert!(Verdict::MaxRetriesExceeded.is_terminal());
        assert!(!Verdict::NotGrounded.is_terminal());
        assert!(!Verdict::NotUseful.is_terminal());
    }
}
