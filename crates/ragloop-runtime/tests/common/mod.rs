//! Scripted collaborators for driving the orchestrator in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ragloop_core::JudgmentKind;
use ragloop_runtime::{
    CallConfig, ClientError, EvidenceStore, JudgmentService, Orchestrator, OrchestratorBuilder,
    ProviderError, Reply, RuntimeConfig, StoreHit, WebSearch, WebSnippet,
};

/// Judgment service answering from per-kind scripts.
///
/// Each kind has a queue of raw replies consumed first and an optional
/// fallback reply used once the queue is empty. Kinds with neither fail
/// with a transport error.
#[derive(Default)]
pub struct ScriptedJudgment {
    queued: Mutex<BTreeMap<JudgmentKind, VecDeque<String>>>,
    fallback: Mutex<BTreeMap<JudgmentKind, String>>,
    drafts: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<JudgmentKind>>,
    generations: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedJudgment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call of `kind` scores `score` unless something is queued.
    pub fn always(self, kind: JudgmentKind, score: &str) -> Self {
        self.fallback.lock().insert(kind, grade(kind, score));
        self
    }

    /// Queue one well-formed reply.
    pub fn next(self, kind: JudgmentKind, score: &str) -> Self {
        self.raw(kind, &grade(kind, score))
    }

    /// Queue one reply verbatim, e.g. malformed text.
    pub fn raw(self, kind: JudgmentKind, raw: &str) -> Self {
        self.queued
            .lock()
            .entry(kind)
            .or_default()
            .push_back(raw.to_string());
        self
    }

    /// Queue generation replies in order. Once exhausted, drafts are
    /// numbered `draft N`.
    pub fn drafts(self, drafts: &[&str]) -> Self {
        self.drafts
            .lock()
            .extend(drafts.iter().map(|d| d.to_string()));
        self
    }

    pub fn calls(&self, kind: JudgmentKind) -> usize {
        self.calls.lock().iter().filter(|k| **k == kind).count()
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }
}

pub fn grade(kind: JudgmentKind, score: &str) -> String {
    format!(
        r#"{{"{}": "{}", "explanation": "scripted"}}"#,
        kind.score_key(),
        score
    )
}

#[async_trait]
impl JudgmentService for ScriptedJudgment {
    async fn structured(
        &self,
        kind: JudgmentKind,
        _instruction: &str,
        _input: &str,
    ) -> Result<Reply, ProviderError> {
        self.calls.lock().push(kind);
        let queued = self.queued.lock().get_mut(&kind).and_then(|q| q.pop_front());
        match queued.or_else(|| self.fallback.lock().get(&kind).cloned()) {
            Some(raw) => Ok(Reply::new(raw)),
            None => Err(ProviderError::HttpError(format!("no script for {}", kind))),
        }
    }

    async fn generate(&self, _instruction: Option<&str>, content: &str) -> Result<Reply, ProviderError> {
        let n = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().push(content.to_string());
        let draft = self
            .drafts
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("draft {}", n));
        Ok(Reply::new(draft))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Evidence store returning a fixed hit list, counting searches.
pub struct FixedStore {
    hits: Vec<StoreHit>,
    pub searches: AtomicUsize,
}

impl FixedStore {
    pub fn new(hits: Vec<StoreHit>) -> Self {
        Self {
            hits,
            searches: AtomicUsize::new(0),
        }
    }

    /// `n` passages with ids `p0..pn`.
    pub fn passages(n: usize) -> Self {
        Self::new(
            (0..n)
                .map(|i| StoreHit::new(format!("p{}", i), format!("TotalEnergies fact number {}", i)))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl EvidenceStore for FixedStore {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<StoreHit>, ClientError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.iter().take(k).cloned().collect())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Web search returning the same snippets for every query.
pub struct FixedWeb {
    snippets: Vec<WebSnippet>,
    pub searches: AtomicUsize,
    pub queries: Mutex<Vec<String>>,
}

impl FixedWeb {
    pub fn new(snippets: &[&str]) -> Self {
        Self {
            snippets: snippets.iter().map(|s| WebSnippet::new(*s)).collect(),
            searches: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WebSearch for FixedWeb {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<WebSnippet>, ClientError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().push(query.to_string());
        Ok(self.snippets.iter().take(k).cloned().collect())
    }

    fn name(&self) -> &str {
        "fixed_web"
    }
}

/// Store whose searches never complete.
pub struct HangingStore;

#[async_trait]
impl EvidenceStore for HangingStore {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<StoreHit>, ClientError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "hanging"
    }
}

/// Store that always fails with a transport error.
pub struct DownStore {
    down: AtomicBool,
    pub searches: AtomicUsize,
}

impl DownStore {
    pub fn new() -> Self {
        Self {
            down: AtomicBool::new(true),
            searches: AtomicUsize::new(0),
        }
    }

    /// Answer later searches with a single passage.
    pub fn recover(&self) {
        self.down.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl EvidenceStore for DownStore {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<StoreHit>, ClientError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(ClientError::Http("connection refused".to_string()));
        }
        Ok(vec![StoreHit::new("p0", "TotalEnergies fact number 0")])
    }

    fn name(&self) -> &str {
        "down"
    }
}

/// Config with short call timings and no store cache.
pub fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default();
    config.calls = CallConfig {
        timeout: Duration::from_secs(2),
        retries: 1,
        backoff: Duration::from_millis(10),
    };
    config.cache.enabled = false;
    config
}

pub fn orchestrator(
    judgment: Arc<ScriptedJudgment>,
    store: Arc<dyn EvidenceStore>,
    web: Arc<dyn WebSearch>,
) -> Orchestrator {
    orchestrator_with(judgment, store, web, test_config())
}

pub fn orchestrator_with(
    judgment: Arc<ScriptedJudgment>,
    store: Arc<dyn EvidenceStore>,
    web: Arc<dyn WebSearch>,
    config: RuntimeConfig,
) -> Orchestrator {
    OrchestratorBuilder::new()
        .judgment_service(judgment)
        .evidence_store(store)
        .web_search(web)
        .config(config)
        .build()
        .unwrap()
}
