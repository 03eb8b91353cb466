//! Control loop orchestrator.
//!
//! For each question the orchestrator wires a fresh set of stages and drives
//! a fresh [`LoopState`] through the state machine:
//! - Each stage runs sequentially; only relevance grading fans out
//! - Every transition is checked by a [`TransitionGuard`]
//! - The quality gate decides between accepting, retrying and giving up
//! - Optional snapshots are streamed after each transition

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use ragloop_core::{
    machine, EvidenceSet, LoopSnapshot, LoopState, Question, Stage, StateError, TransitionGuard,
    Turn, Verdict,
};

use crate::cache::CachedEvidenceStore;
use crate::clients::{EvidenceStore, WebSearch};
use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::judgment::{Judge, JudgmentService, LlmJudgmentService};
use crate::providers::LlmProvider;
use crate::resilience::{CallPolicy, CircuitBreaker, LlmUsage, UsageTracker};
use crate::stages::{
    AnswerGrader, Generator, QuestionRewriter, RelevanceFilter, Retriever, Router, WebFallback,
};

/// Marker prepended to answers that did not pass the quality gate.
pub const UNVERIFIED_MARKER: &str = "[unverified]";

/// A question to run through the loop.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub question: String,

    /// Overrides the configured budget for this run
    pub max_retries: Option<u32>,

    /// Prior turns, oldest first
    pub history: Vec<Turn>,
}

impl RunRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The draft was graded useful and grounded
    Accepted,

    /// The retry budget ran out; the last draft is returned unverified
    RetriesExhausted,

    /// The transition guard stopped the loop after a draft existed
    TransitionLimit,
}

/// Result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub answer: String,

    /// Completed generation attempts
    pub loop_step: u32,

    /// True only when the answer passed the quality gate
    pub verified: bool,

    pub termination: Termination,

    /// The question as last asked (after any rewrites)
    pub question: Question,

    /// Evidence the final draft was generated from
    pub evidence: EvidenceSet,

    pub completed_at: DateTime<Utc>,
}

impl RunOutcome {
    /// The answer, prefixed with [`UNVERIFIED_MARKER`] unless verified.
    pub fn display_answer(&self) -> String {
        if self.verified {
            self.answer.clone()
        } else {
            format!("{} {}", UNVERIFIED_MARKER, self.answer)
        }
    }
}

/// Drives questions through the adaptive retrieval-and-generation loop.
///
/// # Architecture
/// - Collaborators are shared; stages are wired afresh for every run
/// - Loop state and circuit breakers belong to one run and are never shared
/// - Collaborator calls go through the run's [`CallPolicy`] (timeout, retry, circuit)
/// - A single orchestrator serves concurrent runs
pub struct Orchestrator {
    judgment: Arc<dyn JudgmentService>,
    store: Arc<dyn EvidenceStore>,
    web: Arc<dyn WebSearch>,
    config: RuntimeConfig,
    usage: Arc<UsageTracker>,
}

/// The stages of one run, sharing that run's circuits.
struct RunStages {
    router: Router,
    retriever: Retriever,
    relevance: RelevanceFilter,
    web: WebFallback,
    generator: Generator,
    grader: AnswerGrader,
    rewriter: QuestionRewriter,
}

impl Orchestrator {
    /// Validate the config and take hold of the collaborators.
    pub fn new(
        judgment: Arc<dyn JudgmentService>,
        store: Arc<dyn EvidenceStore>,
        web: Arc<dyn WebSearch>,
        config: RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let store: Arc<dyn EvidenceStore> = if config.cache.enabled {
            Arc::new(CachedEvidenceStore::from_config(store, &config.cache))
        } else {
            store
        };

        Ok(Self {
            judgment,
            store,
            web,
            config,
            usage: Arc::new(UsageTracker::new()),
        })
    }

    fn stages(&self) -> RunStages {
        let breaker = Arc::new(CircuitBreaker::new(&self.config.circuit_breaker));
        let policy = CallPolicy::new(self.config.calls.clone(), breaker);
        let judge = Judge::new(self.judgment.clone(), policy.clone(), self.usage.clone());

        RunStages {
            router: Router::new(judge.clone(), &self.config.store_domain),
            retriever: Retriever::new(self.store.clone(), policy.clone(), self.config.store_top_k),
            relevance: RelevanceFilter::new(judge.clone(), self.config.relevance_concurrency),
            web: WebFallback::new(self.web.clone(), policy, self.config.web_top_k),
            generator: Generator::new(judge.clone()),
            grader: AnswerGrader::new(judge.clone()),
            rewriter: QuestionRewriter::new(judge),
        }
    }

    /// Answer a question.
    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, RuntimeError> {
        self.drive(request, None).await
    }

    /// Answer a question, sending a snapshot on entry to every stage.
    ///
    /// The last snapshot is for `Done` and carries the answer. A dropped
    /// receiver does not stop the run.
    pub async fn run_streaming(
        &self,
        request: RunRequest,
        snapshots: mpsc::UnboundedSender<LoopSnapshot>,
    ) -> Result<RunOutcome, RuntimeError> {
        self.drive(request, Some(&snapshots)).await
    }

    async fn drive(
        &self,
        request: RunRequest,
        snapshots: Option<&mpsc::UnboundedSender<LoopSnapshot>>,
    ) -> Result<RunOutcome, RuntimeError> {
        let stages = self.stages();
        let max_retries = request.max_retries.unwrap_or(self.config.max_retries);
        let question = Question::new(request.question).with_history(request.history);

        let mut state = LoopState::new(question, max_retries);
        let mut guard = TransitionGuard::for_budget(max_retries);
        let mut stage = Stage::Routing;
        let mut verdict = None;

        tracing::info!(
            question = state.question.text(),
            max_retries,
            history = state.question.history().len(),
            "Starting control loop"
        );
        emit(snapshots, &state, stage);

        while !stage.is_terminal() {
            let next = match stage {
                Stage::Routing => {
                    let judgment = stages.router.route(&state.question).await?;
                    machine::after_routing(judgment.value)
                }
                Stage::Retrieving => {
                    let evidence = stages.retriever.retrieve(&state.question).await?;
                    state.replace_evidence(evidence);
                    Stage::Filtering
                }
                Stage::Filtering => {
                    let outcome = stages.relevance.filter(&state.question, &state.evidence).await?;
                    state.needs_web_fallback = outcome.needs_fallback;
                    state.replace_evidence(outcome.evidence);
                    machine::after_filtering(outcome.needs_fallback)
                }
                Stage::WebFallback => {
                    let evidence = stages
                        .web
                        .web_search(&state.question, state.evidence.clone())
                        .await?;
                    state.replace_evidence(evidence);
                    Stage::Generating
                }
                Stage::Generating => {
                    stages.generator.generate(&mut state).await?;
                    Stage::Grading
                }
                Stage::Grading => {
                    let grades = stages.grader.grade(&state).await?;
                    if grades.verdict == Verdict::NotUseful && self.config.rewrite_on_not_useful {
                        state.question = stages.rewriter.rewrite(&state.question).await?;
                    }
                    verdict = Some(grades.verdict);
                    machine::after_grading(grades.verdict)
                }
                Stage::Done => break,
            };

            match guard.advance(stage, next, state.retry_count()) {
                Ok(()) => {}
                Err(StateError::TransitionLimit { limit }) => {
                    tracing::warn!(%stage, %next, limit, "Transition limit reached, stopping loop");
                    return self.cut_short(state, limit, snapshots);
                }
                Err(e) => return Err(e.into()),
            }

            tracing::debug!(from = %stage, to = %next, loop_step = state.retry_count(), "Transition");
            stage = next;
            emit(snapshots, &state, stage);
        }

        let termination = match verdict {
            Some(Verdict::UsefulAndGrounded) => Termination::Accepted,
            _ => Termination::RetriesExhausted,
        };
        self.finish(state, termination)
    }

    /// Return the last draft unverified, or fail if there is none.
    fn cut_short(
        &self,
        state: LoopState,
        limit: u32,
        snapshots: Option<&mpsc::UnboundedSender<LoopSnapshot>>,
    ) -> Result<RunOutcome, RuntimeError> {
        if state.draft_answer.is_none() {
            return Err(RuntimeError::TransitionLimit { limit });
        }
        emit(snapshots, &state, Stage::Done);
        self.finish(state, Termination::TransitionLimit)
    }

    fn finish(&self, state: LoopState, termination: Termination) -> Result<RunOutcome, RuntimeError> {
        let answer = state.require_draft(Stage::Done)?.to_string();
        let verified = termination == Termination::Accepted;

        tracing::info!(
            loop_step = state.retry_count(),
            ?termination,
            verified,
            "Control loop finished"
        );

        Ok(RunOutcome {
            answer,
            loop_step: state.retry_count(),
            verified,
            termination,
            question: state.question,
            evidence: state.evidence,
            completed_at: Utc::now(),
        })
    }

    /// LLM usage accumulated across all runs.
    pub fn usage(&self) -> LlmUsage {
        self.usage.get_usage()
    }
}

fn emit(snapshots: Option<&mpsc::UnboundedSender<LoopSnapshot>>, state: &LoopState, stage: Stage) {
    if let Some(tx) = snapshots {
        if tx.send(state.snapshot(stage)).is_err() {
            tracing::debug!(%stage, "Snapshot receiver dropped");
        }
    }
}

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    judgment: Option<Arc<dyn JudgmentService>>,
    provider: Option<Arc<dyn LlmProvider>>,
    store: Option<Arc<dyn EvidenceStore>>,
    web: Option<Arc<dyn WebSearch>>,
    config: RuntimeConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            judgment: None,
            provider: None,
            store: None,
            web: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Use a ready-made judgment service.
    pub fn judgment_service(mut self, service: Arc<dyn JudgmentService>) -> Self {
        self.judgment = Some(service);
        self
    }

    /// Use an LLM provider, wrapped with the model settings from the config.
    /// Ignored when a judgment service is set.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn evidence_store(mut self, store: Arc<dyn EvidenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn web_search(mut self, web: Arc<dyn WebSearch>) -> Self {
        self.web = Some(web);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Orchestrator, RuntimeError> {
        let judgment: Arc<dyn JudgmentService> = match (self.judgment, self.provider) {
            (Some(service), _) => service,
            (None, Some(provider)) => Arc::new(LlmJudgmentService::from_config(provider, &self.config)),
            (None, None) => {
                return Err(RuntimeError::NotConfigured(
                    "No judgment service or provider set".to_string(),
                ))
            }
        };
        let store = self
            .store
            .ok_or_else(|| RuntimeError::NotConfigured("No evidence store set".to_string()))?;
        let web = self
            .web
            .ok_or_else(|| RuntimeError::NotConfigured("No web search set".to_string()))?;

        Orchestrator::new(judgment, store, web, self.config)
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
