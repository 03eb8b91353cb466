//! Collaborator clients: the evidence store and web search.
//!
//! Stages receive these as trait objects so tests and deployments can swap
//! in whatever index or search API they have.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod memory;

#[cfg(feature = "web")]
mod tavily;

pub use memory::InMemoryEvidenceStore;

#[cfg(feature = "web")]
pub use tavily::TavilySearch;

use crate::resilience::Retryable;
use crate::secrets::CredentialError;

/// Errors from collaborator clients.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Failed to load corpus: {0}")]
    Corpus(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl Retryable for ClientError {
    fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::RateLimited { .. } | ClientError::Parse(_) => true,
            ClientError::Api { status, .. } => *status >= 500,
            ClientError::Corpus(_) | ClientError::Credential(_) => false,
        }
    }
}

/// One passage returned by the evidence store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHit {
    pub id: String,
    pub text: String,
}

impl StoreHit {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// One result returned by web search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSnippet {
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WebSnippet {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Nearest-neighbor text search over domain documents.
///
/// Calls are idempotent: the same query and `k` may be issued again on retry.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Up to `k` passages, best match first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<StoreHit>, ClientError>;

    fn name(&self) -> &str;
}

/// Live web search.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Up to `k` snippets, best match first.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebSnippet>, ClientError>;

    fn name(&self) -> &str;
}
