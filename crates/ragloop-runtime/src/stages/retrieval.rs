//! Retrieval from the evidence store.

use ragloop_core::{EvidencePassage, EvidenceSet, Question};
use std::sync::Arc;

use crate::clients::EvidenceStore;
use crate::error::RuntimeError;
use crate::resilience::{CallPolicy, Service};

/// Fetches the top-k passages for a question.
///
/// No matches is an empty set, not an error.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn EvidenceStore>,
    policy: CallPolicy,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn EvidenceStore>, policy: CallPolicy, top_k: usize) -> Self {
        Self { store, policy, top_k }
    }

    pub async fn retrieve(&self, question: &Question) -> Result<EvidenceSet, RuntimeError> {
        let store = &self.store;
        let query = question.text();
        let k = self.top_k;

        let hits = self
            .policy
            .execute(Service::EvidenceStore, || async move { store.search(query, k).await })
            .await
            .map_err(|e| RuntimeError::unavailable(Service::EvidenceStore, e))?;

        let evidence: EvidenceSet = hits
            .into_iter()
            .take(k)
            .map(|hit| EvidencePassage::from_store(hit.id, hit.text))
            .collect();

        tracing::info!(store = store.name(), passages = evidence.len(), k, "Retrieved evidence");
        Ok(evidence)
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("store", &self.store.name())
            .field("top_k", &self.top_k)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, InMemoryEvidenceStore, StoreHit};
    use crate::stages::testing::policy;
    use async_trait::async_trait;
    use ragloop_core::PassageSource;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct DownStore {
        calls: AtomicU32,
    }

    #[async_trait]
    impl EvidenceStore for DownStore {
        async fn search(&self, _query: &str, _k: usize) -> Result<Vec<StoreHit>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Http("connection refused".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrieves_store_passages_in_rank_order() {
        let store = Arc::new(InMemoryEvidenceStore::new(vec![
            StoreHit::new("a", "revenue grew"),
            StoreHit::new("b", "revenue and income grew"),
            StoreHit::new("c", "weather"),
        ]));
        let retriever = Retriever::new(store, policy(), 3);

        let evidence = retriever.retrieve(&Question::new("revenue income")).await.unwrap();
        let ids: Vec<_> = evidence.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(evidence.iter().all(|p| p.source == PassageSource::Store));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_store_is_not_an_error() {
        let retriever = Retriever::new(Arc::new(InMemoryEvidenceStore::default()), policy(), 3);
        let evidence = retriever.retrieve(&Question::new("anything")).await.unwrap();
        assert!(evidence.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_after_one_retry() {
        let store = Arc::new(DownStore {
            calls: AtomicU32::new(0),
        });
        let retriever = Retriever::new(store.clone(), policy(), 3);

        let err = retriever.retrieve(&Question::new("q")).await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::ServiceUnavailable {
                service: Service::EvidenceStore,
                ..
            }
        ));
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
    }
}
