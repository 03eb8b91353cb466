//! Model usage accounting across control-loop runs.

use parking_lot::RwLock;
use ragloop_core::JudgmentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::providers::TokenUsage;

/// Accumulated model usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used
    pub total_tokens: u32,

    /// Prompt/input tokens
    pub prompt_tokens: u32,

    /// Completion/output tokens
    pub completion_tokens: u32,

    /// Number of model calls made
    pub llm_calls: u32,

    /// Generation and rewrite calls
    pub generation_calls: u32,

    /// Structured calls per judgment kind
    pub judgment_calls: BTreeMap<JudgmentKind, u32>,

    /// Judgments that fell back to their conservative value
    pub defaulted_judgments: BTreeMap<JudgmentKind, u32>,
}

impl LlmUsage {
    /// Add token usage from a provider response.
    ///
    /// `kind` is `None` for free-text generation.
    pub fn add(&mut self, usage: &TokenUsage, kind: Option<JudgmentKind>) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;

        match kind {
            Some(kind) => *self.judgment_calls.entry(kind).or_default() += 1,
            None => self.generation_calls += 1,
        }
    }

    pub fn calls_for(&self, kind: JudgmentKind) -> u32 {
        self.judgment_calls.get(&kind).copied().unwrap_or(0)
    }

    pub fn defaulted_for(&self, kind: JudgmentKind) -> u32 {
        self.defaulted_judgments.get(&kind).copied().unwrap_or(0)
    }
}

/// Thread-safe usage accumulator shared by every stage of an orchestrator.
#[derive(Debug, Default)]
pub struct UsageTracker {
    usage: RwLock<LlmUsage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage after a successful call.
    pub fn record_call(&self, kind: Option<JudgmentKind>, usage: &TokenUsage) {
        self.usage.write().add(usage, kind);
    }

    /// Record a judgment resolved to its conservative default.
    pub fn record_default(&self, kind: JudgmentKind) {
        *self
            .usage
            .write()
            .defaulted_judgments
            .entry(kind)
            .or_default() += 1;
    }

    /// Get current usage.
    pub fn get_usage(&self) -> LlmUsage {
        self.usage.read().clone()
    }
}
