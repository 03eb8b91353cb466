//! Web fallback: append live search results to the evidence.

use ragloop_core::{EvidencePassage, EvidenceSet, Question};
use std::sync::Arc;

use crate::clients::WebSearch;
use crate::error::RuntimeError;
use crate::resilience::{CallPolicy, Service};

/// Searches the web with the current question text.
///
/// All snippets are joined (newline-separated, in rank order) into a single
/// passage tagged `web` and appended after the existing evidence. A search
/// with no usable snippets leaves the evidence unchanged.
#[derive(Clone)]
pub struct WebFallback {
    search: Arc<dyn WebSearch>,
    policy: CallPolicy,
    top_k: usize,
}

impl WebFallback {
    pub fn new(search: Arc<dyn WebSearch>, policy: CallPolicy, top_k: usize) -> Self {
        Self {
            search,
            policy,
            top_k,
        }
    }

    pub async fn web_search(&self, question: &Question, evidence: EvidenceSet) -> Result<EvidenceSet, RuntimeError> {
        let search = &self.search;
        let query = question.text();
        let k = self.top_k;

        let snippets = self
            .policy
            .execute(Service::WebSearch, || async move { search.search(query, k).await })
            .await
            .map_err(|e| RuntimeError::unavailable(Service::WebSearch, e))?;

        let combined = snippets
            .iter()
            .take(k)
            .map(|s| s.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if combined.is_empty() {
            tracing::warn!(search = search.name(), "Web search returned no snippets");
            return Ok(evidence);
        }

        let id = format!("web-{}", evidence.count_from(ragloop_core::PassageSource::Web) + 1);
        tracing::info!(search = search.name(), snippets = snippets.len(), passage = %id, "Appended web evidence");
        Ok(evidence.appended(EvidencePassage::from_web(id, combined)))
    }
}

impl std::fmt::Debug for WebFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebFallback")
            .field("search", &self.search.name())
            .field("top_k", &self.top_k)
            .finish()
    }
}
