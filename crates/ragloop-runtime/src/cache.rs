//! Caching layer for evidence-store lookups.
//!
//! Repeated questions (and retries of the same retrieval) reuse the hits of
//! an identical `(query, k)` search instead of hitting the index again.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::clients::{ClientError, EvidenceStore, StoreHit};
use crate::config::CacheConfig;

/// Cache key for a store search.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey {
    query: String,
    k: usize,
}

impl CacheKey {
    pub fn new(query: &str, k: usize) -> Self {
        Self {
            query: query.to_string(),
            k,
        }
    }
}

/// An [`EvidenceStore`] decorator backed by a moka cache.
///
/// Queries are trimmed before both the lookup and the inner search, so a
/// cached entry always holds what the inner store returned for its key.
/// Only successful searches are cached.
pub struct CachedEvidenceStore {
    inner: Arc<dyn EvidenceStore>,
    cache: Cache<CacheKey, Vec<StoreHit>>,
}

impl CachedEvidenceStore {
    pub fn new(inner: Arc<dyn EvidenceStore>, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }

    pub fn from_config(inner: Arc<dyn EvidenceStore>, config: &CacheConfig) -> Self {
        Self::new(inner, config.max_entries, config.ttl)
    }
}

#[async_trait]
impl EvidenceStore for CachedEvidenceStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<StoreHit>, ClientError> {
        let query = query.trim();
        let key = CacheKey::new(query, k);
        if let Some(hits) = self.cache.get(&key).await {
            tracing::debug!(store = self.inner.name(), k, "Evidence cache hit");
            return Ok(hits);
        }

        let hits = self.inner.search(query, k).await?;
        self.cache.insert(key, hits.clone()).await;
        Ok(hits)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingStore {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl EvidenceStore for CountingStore {
        async fn search(&self, query: &str, _k: usize) -> Result<Vec<StoreHit>, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClientError::Http("connection refused".into()));
            }
            Ok(vec![StoreHit::new("p1", format!("about {}", query))])
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_repeated_search_hits_cache() {
        let inner = Arc::new(CountingStore {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let cached = CachedEvidenceStore::from_config(inner.clone(), &CacheConfig::default());

        let first = cached.search("net income", 3).await.unwrap();
        let second = cached.search("  net income ", 3).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // Different k is a different search
        cached.search("net income", 5).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let inner = Arc::new(CountingStore {
            calls: AtomicU32::new(0),
            fail: true,
        });
        let cached = CachedEvidenceStore::new(inner.clone(), 10, Duration::from_secs(60));

        assert!(cached.search("q", 3).await.is_err());
        assert!(cached.search("q", 3).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_inner_store_sees_trimmed_query() {
        let inner = Arc::new(CountingStore {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let cached = CachedEvidenceStore::new(inner.clone(), 10, Duration::from_secs(60));

        let padded = cached.search("  dividend ", 3).await.unwrap();
        assert_eq!(padded[0].text, "about dividend");

        let plain = cached.search("dividend", 3).await.unwrap();
        assert_eq!(plain, padded);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
