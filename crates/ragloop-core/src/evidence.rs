//! Evidence passages and ordered evidence sets.
//!
//! Insertion order is provenance order: it is preserved through filtering
//! and web fallback so answers can cite passages in the order they arrived.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a passage came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassageSource {
    /// Curated evidence store
    Store,
    /// Live web search
    Web,
}

impl fmt::Display for PassageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassageSource::Store => write!(f, "store"),
            PassageSource::Web => write!(f, "web"),
        }
    }
}

/// A single piece of retrieved evidence. Immutable once retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidencePassage {
    /// Stable identifier (e.g. "report-2023.pdf#p12:c3")
    pub id: String,

    /// Passage body
    pub text: String,

    pub source: PassageSource,
}

impl EvidencePassage {
    /// Create a passage retrieved from the evidence store.
    pub fn from_store(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: PassageSource::Store,
        }
    }

    /// Create a passage from web search.
    pub fn from_web(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            source: PassageSource::Web,
        }
    }
}

/// Ordered sequence of passages.
///
/// Changed only by [`EvidenceSet::appended`] (web fallback) or by building a
/// new set (relevance filtering). There is no in-place removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceSet {
    passages: Vec<EvidencePassage>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_passages(passages: Vec<EvidencePassage>) -> Self {
        Self { passages }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn passages(&self) -> &[EvidencePassage] {
        &self.passages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EvidencePassage> {
        self.passages.iter()
    }

    /// Return this set with `passage` added at the end.
    pub fn appended(mut self, passage: EvidencePassage) -> Self {
        self.passages.push(passage);
        self
    }

    /// Number of passages from the given source.
    pub fn count_from(&self, source: PassageSource) -> usize {
        self.passages.iter().filter(|p| p.source == source).count()
    }

    /// True if `self` is an order-preserving prefix of `other`.
    pub fn is_prefix_of(&self, other: &EvidenceSet) -> bool {
        other.passages.starts_with(&self.passages)
    }

    /// True if every passage of `self` appears in `other` in the same
    /// relative order.
    pub fn is_subsequence_of(&self, other: &EvidenceSet) -> bool {
        let mut candidates = other.passages.iter();
        self.passages
            .iter()
            .all(|wanted| candidates.any(|candidate| candidate == wanted))
    }

    /// Format passages into a single context block separated by blank lines.
    pub fn format_context(&self) -> String {
        self.passages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl IntoIterator for EvidenceSet {
    type Item = EvidencePassage;
    type IntoIter = std::vec::IntoIter<EvidencePassage>;

    fn into_iter(self) -> Self::IntoIter {
        self.passages.into_iter()
    }
}

impl<'a> IntoIterator for &'a EvidenceSet {
    type Item = &'a EvidencePassage;
    type IntoIter = std::slice::Iter<'a, EvidencePassage>;

    fn into_iter(self) -> Self::IntoIter {
        self.passages.iter()
    }
}

impl FromIterator<EvidencePassage> for EvidenceSet {
    fn from_iter<I: IntoIterator<Item = EvidencePassage>>(iter: I) -> Self {
        Self {
            passages: iter.into_iter().collect(),
        }
    }
}
