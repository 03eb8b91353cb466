//! Answer quality gate.

use ragloop_core::{GroundingVerdict, Judgment, LoopState, QualityGate, Stage, UsefulnessVerdict, Verdict};
use serde::Serialize;

use crate::error::RuntimeError;
use crate::judgment::Judge;
use crate::prompts;

/// Grades collected for one draft.
///
/// `grounding` and `usefulness` are `None` when the call was skipped: both
/// when the budget is already spent, usefulness when the draft is not
/// grounded.
#[derive(Debug, Clone, Serialize)]
pub struct Grades {
    pub grounding: Option<Judgment<GroundingVerdict>>,
    pub usefulness: Option<Judgment<UsefulnessVerdict>>,
    pub verdict: Verdict,
}

/// Grades the current draft for grounding, then usefulness.
#[derive(Debug, Clone)]
pub struct AnswerGrader {
    judge: Judge,
    gate: QualityGate,
}

impl AnswerGrader {
    pub fn new(judge: Judge) -> Self {
        Self {
            judge,
            gate: QualityGate::new(),
        }
    }

    pub async fn grade(&self, state: &LoopState) -> Result<Grades, RuntimeError> {
        let draft = state.require_draft(Stage::Grading)?;

        if state.budget_exhausted() {
            tracing::warn!(
                loop_step = state.retry_count(),
                max_retries = state.max_retries,
                "Retry budget exhausted"
            );
            return Ok(Grades {
                grounding: None,
                usefulness: None,
                verdict: self.gate.decide(true, None, None),
            });
        }

        let grounding = self
            .judge
            .judge::<GroundingVerdict>(
                prompts::GROUNDING_INSTRUCTIONS,
                &prompts::grounding_input(&state.evidence, draft),
            )
            .await?;

        let usefulness = if grounding.value == GroundingVerdict::Grounded {
            Some(
                self.judge
                    .judge::<UsefulnessVerdict>(
                        prompts::USEFULNESS_INSTRUCTIONS,
                        &prompts::usefulness_input(state.question.text(), draft),
                    )
                    .await?,
            )
        } else {
            None
        };

        let verdict = self.gate.decide(
            false,
            Some(grounding.value),
            usefulness.as_ref().map(|u| u.value),
        );
        tracing::info!(
            loop_step = state.retry_count(),
            grounding = ?grounding.value,
            usefulness = ?usefulness.as_ref().map(|u| u.value),
            %verdict,
            "Graded draft"
        );

        Ok(Grades {
            grounding: Some(grounding),
            usefulness,
            verdict,
        })
    }
}
