//! Per-passage relevance filtering.

use futures::stream::{self, StreamExt, TryStreamExt};
use ragloop_core::{EvidenceSet, Question, RelevanceVerdict};

use crate::error::RuntimeError;
use crate::judgment::Judge;
use crate::prompts;

/// Result of filtering an evidence set.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Relevant passages, in their original order
    pub evidence: EvidenceSet,

    /// True if any passage was discarded, or there was nothing to filter
    pub needs_fallback: bool,

    pub discarded: usize,
}

/// Grades passages independently and keeps the relevant ones.
///
/// Any discarded passage requests web fallback, as does an empty input.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    judge: Judge,
    concurrency: usize,
}

impl RelevanceFilter {
    pub fn new(judge: Judge, concurrency: usize) -> Self {
        Self {
            judge,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn filter(&self, question: &Question, evidence: &EvidenceSet) -> Result<FilterOutcome, RuntimeError> {
        if evidence.is_empty() {
            tracing::info!("No evidence to filter, requesting web fallback");
            return Ok(FilterOutcome {
                evidence: EvidenceSet::new(),
                needs_fallback: true,
                discarded: 0,
            });
        }

        // buffered() yields in input order regardless of completion order
        let verdicts: Vec<RelevanceVerdict> = stream::iter(evidence.iter())
            .map(|passage| {
                let input = prompts::relevance_input(&passage.text, question.text());
                async move {
                    let judgment = self
                        .judge
                        .judge::<RelevanceVerdict>(prompts::RELEVANCE_INSTRUCTIONS, &input)
                        .await?;
                    tracing::debug!(passage = %passage.id, verdict = ?judgment.value, "Graded passage");
                    Ok::<_, RuntimeError>(judgment.value)
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let kept: EvidenceSet = evidence
            .iter()
            .zip(&verdicts)
            .filter(|(_, verdict)| **verdict == RelevanceVerdict::Relevant)
            .map(|(passage, _)| passage.clone())
            .collect();

        let discarded = evidence.len() - kept.len();
        tracing::info!(kept = kept.len(), discarded, "Filtered evidence");

        Ok(FilterOutcome {
            evidence: kept,
            needs_fallback: discarded > 0,
            discarded,
        })
    }
}
