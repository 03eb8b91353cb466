//! Question rewriting for web search.

use ragloop_core::Question;

use crate::error::RuntimeError;
use crate::judgment::Judge;
use crate::prompts;

/// Rephrases a question before another round of web search.
///
/// Only used when `rewrite_on_not_useful` is enabled. The rewritten question
/// keeps the original's history and remembers where it came from.
#[derive(Debug, Clone)]
pub struct QuestionRewriter {
    judge: Judge,
}

impl QuestionRewriter {
    pub fn new(judge: Judge) -> Self {
        Self { judge }
    }

    pub async fn rewrite(&self, question: &Question) -> Result<Question, RuntimeError> {
        let raw = self
            .judge
            .generate(
                Some(prompts::REWRITE_INSTRUCTIONS),
                &prompts::rewrite_input(question.text()),
            )
            .await?;

        let text = raw.trim().trim_matches('"').trim();
        if text.is_empty() {
            tracing::warn!("Rewrite came back empty, keeping question");
            return Ok(question.clone());
        }

        tracing::info!(from = question.text(), to = text, "Rewrote question");
        Ok(question.rewrite(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::{judge, FakeJudgment};
    use ragloop_core::Turn;

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_keeps_lineage_and_history() {
        let service = FakeJudgment::new().draft("\"TotalEnergies 2023 net income\"");
        let rewriter = QuestionRewriter::new(judge(service));

        let original = Question::new("how much did they earn").with_history(vec![Turn::user("hi")]);
        let rewritten = rewriter.rewrite(&original).await.unwrap();

        assert_eq!(rewritten.text(), "TotalEnergies 2023 net income");
        assert_eq!(rewritten.history(), original.history());
        assert_eq!(rewritten.original().text(), "how much did they earn");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_rewrite_keeps_question() {
        let service = FakeJudgment::new().draft("   ");
        let rewriter = QuestionRewriter::new(judge(service));

        let original = Question::new("q");
        let rewritten = rewriter.rewrite(&original).await.unwrap();
        assert_eq!(rewritten.text(), "q");
        assert!(rewritten.rewritten_from().is_none());
    }
}
