//! Questions and conversation history.
//!
//! A [`Question`] is immutable. Rewriting produces a new value that keeps
//! the question it was derived from, so the original wording is always
//! available for audit.

use serde::{Deserialize, Serialize};

/// Speaker of a prior conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A prior turn in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Create a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A user question, optionally carrying the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    history: Vec<Turn>,

    /// The question this one was rewritten from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rewritten_from: Option<Box<Question>>,
}

impl Question {
    /// Create a question with no history.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            history: Vec::new(),
            rewritten_from: None,
        }
    }

    /// Attach prior conversation turns (oldest first).
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The question this one was directly rewritten from.
    pub fn rewritten_from(&self) -> Option<&Question> {
        self.rewritten_from.as_deref()
    }

    /// The first question in the rewrite chain (self if never rewritten).
    pub fn original(&self) -> &Question {
        let mut current = self;
        while let Some(previous) = current.rewritten_from.as_deref() {
            current = previous;
        }
        current
    }

    /// Produce a rewritten question. History carries over unchanged.
    pub fn rewrite(&self, text: impl Into<String>) -> Question {
        Question {
            text: text.into(),
            history: self.history.clone(),
            rewritten_from: Some(Box::new(self.clone())),
        }
    }

    /// True when the question has no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
