//! In-process evidence store ranked by query-term overlap.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use super::{ClientError, EvidenceStore, StoreHit};

lazy_static! {
    static ref TERM: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();

    static ref STOPWORDS: HashSet<&'static str> = [
        "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does",
        "for", "from", "had", "has", "have", "how", "in", "is", "it", "its", "of", "on", "or",
        "than", "that", "the", "their", "this", "to", "was", "were", "what", "when", "where",
        "which", "who", "why", "will", "with",
    ]
    .into_iter()
    .collect();
}

/// Lowercased content words; single characters and stopwords are dropped.
fn terms(text: &str) -> HashSet<String> {
    TERM.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() > 1 && !STOPWORDS.contains(t.as_str()))
        .collect()
}

/// Passages held in memory.
///
/// Ranking counts the distinct query terms each passage contains. Ties keep
/// insertion order and passages sharing no term with the query are not
/// returned.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEvidenceStore {
    passages: Vec<(StoreHit, HashSet<String>)>,
}

impl InMemoryEvidenceStore {
    pub fn new(passages: impl IntoIterator<Item = StoreHit>) -> Self {
        Self {
            passages: passages
                .into_iter()
                .map(|hit| {
                    let index = terms(&hit.text);
                    (hit, index)
                })
                .collect(),
        }
    }

    /// Parse a JSON array of `{"id": ..., "text": ...}` objects.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        let hits: Vec<StoreHit> =
            serde_json::from_str(json).map_err(|e| ClientError::Corpus(e.to_string()))?;
        Ok(Self::new(hits))
    }

    /// Load a corpus file in the [`InMemoryEvidenceStore::from_json`] format.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::Corpus(format!("{}: {}", path.display(), e)))?;
        let store = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), passages = store.len(), "Loaded evidence corpus");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn rank(&self, query: &str, k: usize) -> Vec<StoreHit> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, &StoreHit)> = self
            .passages
            .iter()
            .map(|(hit, index)| (query_terms.intersection(index).count(), hit))
            .filter(|(score, _)| *score > 0)
            .collect();

        // sort_by is stable, so equal scores stay in insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, hit)| hit.clone()).collect()
    }
}

#[async_trait]
impl EvidenceStore for InMemoryEvidenceStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<StoreHit>, ClientError> {
        Ok(self.rank(query, k))
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> InMemoryEvidenceStore {
        InMemoryEvidenceStore::new(vec![
            StoreHit::new("p1", "Adjusted net income reached $23.2 billion in 2023."),
            StoreHit::new("p2", "Upstream production grew 2% to 2.5 Mboe/d."),
            StoreHit::new("p3", "Net cash flow from operations was strong."),
            StoreHit::new("p4", "The board proposed a final dividend."),
        ])
    }

    #[tokio::test]
    async fn test_ranks_by_overlap() {
        let hits = corpus().search("What was net income in 2023?", 3).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }

    #[tokio::test]
    async fn test_respects_k() {
        let hits = corpus().search("net income cash production dividend", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_no_overlap_returns_nothing() {
        let hits = corpus().search("weather in Lisbon", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_function_words_do_not_match() {
        let hits = corpus().search("What was the weather in the city?", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_terms_skip_stopwords() {
        let terms = terms("What was Net Income in 2023?");
        let mut sorted: Vec<_> = terms.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["2023", "income", "net"]);
    }

    #[test]
    fn test_from_json() {
        let store = InMemoryEvidenceStore::from_json(
            r#"[{"id": "a", "text": "alpha"}, {"id": "b", "text": "beta"}]"#,
        )
        .unwrap();
        assert_eq!(store.len(), 2);

        let err = InMemoryEvidenceStore::from_json("{not json").unwrap_err();
        assert!(matches!(err, ClientError::Corpus(_)));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = InMemoryEvidenceStore::load("/nonexistent/corpus.json")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/corpus.json"));
    }
}
