//! Typed judgments.
//!
//! Every structured grading call resolves to a closed enumeration, never
//! free text. Tokens are matched case-insensitively; anything else is an
//! [`UnknownToken`] and the caller treats it as a malformed judgment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The four structured judgment operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentKind {
    Route,
    Relevance,
    Grounding,
    Usefulness,
}

impl JudgmentKind {
    /// JSON key that carries the decision token.
    pub fn score_key(&self) -> &'static str {
        match self {
            JudgmentKind::Route => "datasource",
            _ => "binary_score",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JudgmentKind::Route => "route",
            JudgmentKind::Relevance => "relevance",
            JudgmentKind::Grounding => "grounding",
            JudgmentKind::Usefulness => "usefulness",
        }
    }
}

impl fmt::Display for JudgmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token that is not part of the declared enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{token}' is not a valid {kind} token")]
pub struct UnknownToken {
    pub kind: JudgmentKind,
    pub token: String,
}

impl UnknownToken {
    fn new(kind: JudgmentKind, token: &str) -> Self {
        Self {
            kind,
            token: token.to_string(),
        }
    }
}

/// A closed decision enumeration produced by one judgment kind.
pub trait Decision: FromStr<Err = UnknownToken> + Copy + fmt::Debug + Send + Sync + 'static {
    const KIND: JudgmentKind;

    /// Value used when the service keeps answering outside the enumeration.
    ///
    /// Always the side that does not present unverified content as verified.
    fn conservative() -> Self;
}

fn normalize(token: &str) -> String {
    token.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// Which evidence source should answer a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    EvidenceStore,
    WebSearch,
}

impl FromStr for RouteDecision {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "vectorstore" | "vector_store" | "evidence_store" | "store" => {
                Ok(RouteDecision::EvidenceStore)
            }
            "websearch" | "web_search" | "web" => Ok(RouteDecision::WebSearch),
            _ => Err(UnknownToken::new(JudgmentKind::Route, s)),
        }
    }
}

impl Decision for RouteDecision {
    const KIND: JudgmentKind = JudgmentKind::Route;

    fn conservative() -> Self {
        RouteDecision::WebSearch
    }
}

/// Whether a passage is relevant to the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceVerdict {
    Relevant,
    NotRelevant,
}

impl FromStr for RelevanceVerdict {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "yes" | "relevant" => Ok(RelevanceVerdict::Relevant),
            "no" | "not_relevant" => Ok(RelevanceVerdict::NotRelevant),
            _ => Err(UnknownToken::new(JudgmentKind::Relevance, s)),
        }
    }
}

impl Decision for RelevanceVerdict {
    const KIND: JudgmentKind = JudgmentKind::Relevance;

    fn conservative() -> Self {
        RelevanceVerdict::NotRelevant
    }
}

/// Whether a draft answer is supported by the evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundingVerdict {
    Grounded,
    NotGrounded,
}

impl FromStr for GroundingVerdict {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "yes" => Ok(GroundingVerdict::Grounded),
            "no" => Ok(GroundingVerdict::NotGrounded),
            _ => Err(UnknownToken::new(JudgmentKind::Grounding, s)),
        }
    }
}

impl Decision for GroundingVerdict {
    const KIND: JudgmentKind = JudgmentKind::Grounding;

    fn conservative() -> Self {
        GroundingVerdict::NotGrounded
    }
}

/// Whether a draft answer addresses the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsefulnessVerdict {
    Useful,
    NotUseful,
}

impl FromStr for UsefulnessVerdict {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "yes" => Ok(UsefulnessVerdict::Useful),
            "no" => Ok(UsefulnessVerdict::NotUseful),
            _ => Err(UnknownToken::new(JudgmentKind::Usefulness, s)),
        }
    }
}

impl Decision for UsefulnessVerdict {
    const KIND: JudgmentKind = JudgmentKind::Usefulness;

    fn conservative() -> Self {
        UsefulnessVerdict::NotUseful
    }
}

/// Result of a structured judgment call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment<T> {
    pub value: T,

    /// Free-text reasoning returned alongside the token, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,

    /// True when the value is the conservative default, not a service answer
    #[serde(default)]
    pub defaulted: bool,
}

impl<T: Decision> Judgment<T> {
    pub fn new(value: T, explanation: Option<String>) -> Self {
        Self {
            value,
            explanation,
            defaulted: false,
        }
    }

    /// The conservative default for this decision type.
    pub fn conservative() -> Self {
        Self {
            value: T::conservative(),
            explanation: None,
            defaulted: true,
        }
    }
}
