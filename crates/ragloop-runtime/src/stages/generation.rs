//! Draft answer generation.

use ragloop_core::LoopState;

use crate::error::RuntimeError;
use crate::judgment::Judge;
use crate::prompts;

/// Drafts an answer from the current evidence and records the attempt.
#[derive(Debug, Clone)]
pub struct Generator {
    judge: Judge,
}

impl Generator {
    pub fn new(judge: Judge) -> Self {
        Self { judge }
    }

    /// Produce a draft and increment the retry counter.
    ///
    /// With no evidence at all the draft is a fixed insufficient-evidence
    /// answer and no model call is made; the attempt still counts.
    ///
    /// Returns the loop step after this attempt.
    pub async fn generate(&self, state: &mut LoopState) -> Result<u32, RuntimeError> {
        if state.evidence.is_empty() {
            let step = state.record_generation(prompts::INSUFFICIENT_EVIDENCE_ANSWER);
            tracing::warn!(loop_step = step, "No evidence, drafted insufficient-evidence answer");
            return Ok(step);
        }

        let prompt = prompts::generation_prompt(
            &state.evidence,
            state.question.text(),
            state.question.history(),
        );
        let draft = self.judge.generate(None, &prompt).await?;

        let step = state.record_generation(draft.trim());
        tracing::info!(
            loop_step = step,
            passages = state.evidence.len(),
            chars = draft.len(),
            "Generated draft"
        );
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::{judge, FakeJudgment};
    use ragloop_core::{EvidencePassage, EvidenceSet, Question, Turn};

    fn state_with_evidence() -> LoopState {
        let mut state = LoopState::new(Question::new("What was net income?"), 3);
        state.replace_evidence(EvidenceSet::from_passages(vec![EvidencePassage::from_store(
            "a",
            "Net income was $21.4B.",
        )]));
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_increments_counter() {
        let service = FakeJudgment::new().draft("  $21.4B  ").draft("Again $21.4B");
        let generator = Generator::new(judge(service.clone()));
        let mut state = state_with_evidence();

        assert_eq!(generator.generate(&mut state).await.unwrap(), 1);
        assert_eq!(state.draft_answer.as_deref(), Some("$21.4B"));

        assert_eq!(generator.generate(&mut state).await.unwrap(), 2);
        assert_eq!(state.draft_answer.as_deref(), Some("Again $21.4B"));
        assert!(service.prompts.lock()[0].contains("Net income was $21.4B."));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_evidence_skips_model() {
        let service = FakeJudgment::new();
        let generator = Generator::new(judge(service.clone()));
        let mut state = LoopState::new(Question::new("q"), 3);

        assert_eq!(generator.generate(&mut state).await.unwrap(), 1);
        assert_eq!(
            state.draft_answer.as_deref(),
            Some(prompts::INSUFFICIENT_EVIDENCE_ANSWER)
        );
        assert!(service.prompts.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_reaches_prompt() {
        let service = FakeJudgment::new();
        let generator = Generator::new(judge(service.clone()));
        let mut state = state_with_evidence();
        state.question = Question::new("And in 2022?").with_history(vec![
            Turn::user("What was net income in 2023?"),
            Turn::assistant("$21.4B"),
        ]);

        generator.generate(&mut state).await.unwrap();
        let prompt = service.prompts.lock()[0].clone();
        assert!(prompt.contains("user: What was net income in 2023?"));
        assert!(prompt.contains("assistant: $21.4B"));
    }
}
