//! The judgment service: the one seam through which the loop consults a
//! language model.
//!
//! Structured calls return raw replies that [`decode`] maps onto closed
//! enumerations; free-text calls return drafts and rewrites. [`Judge`]
//! adds the call policy and conservative defaults on top.

use async_trait::async_trait;
use ragloop_core::JudgmentKind;
use std::sync::Arc;

mod decode;
mod judge;

pub use decode::{decode, strip_fence, DecodeError};
pub use judge::Judge;

use crate::config::RuntimeConfig;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError, TokenUsage};

/// Raw reply from the judgment service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub content: String,
    pub usage: TokenUsage,
}

impl Reply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// A service that answers structured and free-text prompts.
#[async_trait]
pub trait JudgmentService: Send + Sync {
    /// Structured call. The reply is expected to be a JSON object carrying
    /// `kind`'s score key.
    async fn structured(
        &self,
        kind: JudgmentKind,
        instruction: &str,
        input: &str,
    ) -> Result<Reply, ProviderError>;

    /// Free-text call.
    async fn generate(&self, instruction: Option<&str>, content: &str) -> Result<Reply, ProviderError>;

    fn name(&self) -> &str;
}

/// [`JudgmentService`] over any chat-completion provider.
pub struct LlmJudgmentService {
    provider: Arc<dyn LlmProvider>,
    completion: CompletionConfig,
}

impl LlmJudgmentService {
    pub fn new(provider: Arc<dyn LlmProvider>, completion: CompletionConfig) -> Self {
        Self {
            provider,
            completion,
        }
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &RuntimeConfig) -> Self {
        Self::new(
            provider,
            CompletionConfig::from_model(&config.model, config.calls.timeout),
        )
    }
}

#[async_trait]
impl JudgmentService for LlmJudgmentService {
    async fn structured(
        &self,
        kind: JudgmentKind,
        instruction: &str,
        input: &str,
    ) -> Result<Reply, ProviderError> {
        let messages = vec![ChatMessage::system(instruction), ChatMessage::user(input)];
        let config = self.completion.clone().json();

        tracing::trace!(%kind, provider = self.provider.name(), "Structured call");
        let response = self.provider.complete(messages, &config).await?;
        Ok(Reply {
            content: response.content,
            usage: response.usage,
        })
    }

    async fn generate(&self, instruction: Option<&str>, content: &str) -> Result<Reply, ProviderError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instruction) = instruction {
            messages.push(ChatMessage::system(instruction));
        }
        messages.push(ChatMessage::user(content));

        let response = self.provider.complete(messages, &self.completion).await?;
        Ok(Reply {
            content: response.content,
            usage: response.usage,
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
