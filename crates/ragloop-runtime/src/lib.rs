//! # ragloop-runtime
//!
//! Async control loop for adaptive retrieval-and-generation.
//!
//! This crate wires the deterministic policy in `ragloop-core` to the
//! outside world: a judgment service (any LLM provider), an evidence store
//! and a web search client.
//!
//! ## Key Guarantees
//!
//! 1. **Bounded**: At most `max_retries + 1` generations per question, and a
//!    transition cap independent of the retry counter
//! 2. **Time-boxed**: Every external call has a timeout and a bounded retry
//! 3. **Conservative**: A judgment that stays malformed never verifies an
//!    answer
//! 4. **Injected**: Stages take their collaborators as arguments, so any of
//!    them can be replaced with a fake
//! 5. **Isolated**: Runs share collaborators only; loop state and circuit
//!    breakers are created per run
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragloop_runtime::{InMemoryEvidenceStore, OrchestratorBuilder, RunRequest};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .provider(provider)
//!     .evidence_store(Arc::new(InMemoryEvidenceStore::load("corpus.json").await?))
//!     .web_search(web)
//!     .build()?;
//!
//! let outcome = orchestrator.run(RunRequest::new("What was 2023 net income?")).await?;
//! println!("{}", outcome.display_answer());
//! ```

pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod judgment;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod secrets;
pub mod stages;

pub use cache::CachedEvidenceStore;
pub use clients::{ClientError, EvidenceStore, InMemoryEvidenceStore, StoreHit, WebSearch, WebSnippet};
#[cfg(feature = "web")]
pub use clients::TavilySearch;
pub use config::{CacheConfig, CallConfig, ConfigError, ModelConfig, RuntimeConfig};
pub use error::RuntimeError;
pub use judgment::{DecodeError, Judge, JudgmentService, LlmJudgmentService, Reply};
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, RunOutcome, RunRequest, Termination, UNVERIFIED_MARKER,
};
pub use providers::{LlmProvider, ProviderError, ProviderRegistry, TokenUsage};
#[cfg(feature = "local")]
pub use providers::OllamaProvider;
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, LlmUsage, Service, UsageTracker};
pub use secrets::{ApiCredential, CredentialError};
