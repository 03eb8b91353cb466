//! Routing: evidence store or web search.

use ragloop_core::{Judgment, Question, RouteDecision};

use crate::error::RuntimeError;
use crate::judgment::Judge;
use crate::prompts;

/// Chooses the evidence source for a question.
///
/// A reply that stays malformed after retries routes to web search, which
/// keeps the loop moving.
#[derive(Debug, Clone)]
pub struct Router {
    judge: Judge,
    instructions: String,
}

impl Router {
    /// `store_domain` describes what the evidence store covers.
    pub fn new(judge: Judge, store_domain: &str) -> Self {
        Self {
            judge,
            instructions: prompts::router_instructions(store_domain),
        }
    }

    pub async fn route(&self, question: &Question) -> Result<Judgment<RouteDecision>, RuntimeError> {
        let judgment = self
            .judge
            .judge::<RouteDecision>(&self.instructions, question.text())
            .await?;

        tracing::info!(
            decision = ?judgment.value,
            defaulted = judgment.defaulted,
            "Routed question"
        );
        Ok(judgment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::{judge, FakeJudgment};
    use ragloop_core::JudgmentKind;

    #[tokio::test(start_paused = true)]
    async fn test_routes_to_store() {
        let service = FakeJudgment::new().always(JudgmentKind::Route, "vectorstore");
        let router = Router::new(judge(service.clone()), "annual reports");

        let judgment = router.route(&Question::new("What was 2023 revenue?")).await.unwrap();
        assert_eq!(judgment.value, RouteDecision::EvidenceStore);
        assert_eq!(service.calls(JudgmentKind::Route), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_twice_routes_to_web() {
        let service = FakeJudgment::new()
            .then(JudgmentKind::Route, "I think the vectorstore")
            .then(JudgmentKind::Route, r#"{"route": "vectorstore"}"#);
        let router = Router::new(judge(service.clone()), "annual reports");

        let judgment = router.route(&Question::new("q")).await.unwrap();
        assert_eq!(judgment.value, RouteDecision::WebSearch);
        assert!(judgment.defaulted);
        assert_eq!(service.calls(JudgmentKind::Route), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_routing_ignores_history() {
        let service = FakeJudgment::new().always(JudgmentKind::Route, "websearch");
        let router = Router::new(judge(service.clone()), "annual reports");

        let question = Question::new("And today?")
            .with_history(vec![ragloop_core::Turn::user("secret earlier turn")]);
        router.route(&question).await.unwrap();

        let inputs = service.inputs.lock();
        assert_eq!(inputs[0].1, "And today?");
    }
}
