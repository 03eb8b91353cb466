//! Strict decoding of structured judgment replies.
//!
//! A reply is accepted only when it is a single JSON object (optionally
//! wrapped in a Markdown code fence) that matches the kind's schema and
//! whose score token belongs to the closed enumeration. There is no
//! best-effort extraction from surrounding prose.

use lazy_static::lazy_static;
use ragloop_core::{Decision, Judgment, JudgmentKind, UnknownToken};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;
use thiserror::Error;

lazy_static! {
    static ref FENCE: Regex =
        Regex::new(r"(?s)^\s*```[A-Za-z]*\s*\n?(?P<body>.*?)\s*```\s*$").unwrap();
}

const ROUTE_SCHEMA_JSON: &str = r#"{
  "type": "object",
  "required": ["datasource"],
  "properties": {
    "datasource": { "type": "string", "minLength": 1 },
    "explanation": { "type": "string" }
  }
}"#;

const GRADE_SCHEMA_JSON: &str = r#"{
  "type": "object",
  "required": ["binary_score"],
  "properties": {
    "binary_score": { "type": "string", "minLength": 1 },
    "explanation": { "type": "string" }
  }
}"#;

static ROUTE_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
static GRADE_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// A reply that could not be mapped onto its enumeration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("{kind} reply is not valid JSON: {reason}")]
    InvalidJson { kind: JudgmentKind, reason: String },

    #[error("{kind} reply does not match schema: {}", .errors.join("; "))]
    Schema {
        kind: JudgmentKind,
        errors: Vec<String>,
    },

    #[error(transparent)]
    UnknownToken(#[from] UnknownToken),

    #[error("Failed to load {kind} schema: {reason}")]
    SchemaLoad { kind: JudgmentKind, reason: String },
}

fn get_validator(kind: JudgmentKind) -> Result<&'static jsonschema::Validator, DecodeError> {
    let (cell, source) = match kind {
        JudgmentKind::Route => (&ROUTE_SCHEMA, ROUTE_SCHEMA_JSON),
        _ => (&GRADE_SCHEMA, GRADE_SCHEMA_JSON),
    };

    let result = cell.get_or_init(|| {
        let schema_value: JsonValue = match serde_json::from_str(source) {
            Ok(v) => v,
            Err(e) => return Err(format!("Invalid schema JSON: {}", e)),
        };

        match jsonschema::options().build(&schema_value) {
            Ok(v) => Ok(v),
            Err(e) => Err(format!("Failed to compile schema: {}", e)),
        }
    });

    match result {
        Ok(v) => Ok(v),
        Err(e) => Err(DecodeError::SchemaLoad {
            kind,
            reason: e.clone(),
        }),
    }
}

/// Remove one surrounding Markdown code fence, if present.
pub fn strip_fence(raw: &str) -> &str {
    match FENCE.captures(raw).and_then(|caps| caps.name("body")) {
        Some(body) => body.as_str(),
        None => raw.trim(),
    }
}

/// Decode a structured reply into a typed judgment.
pub fn decode<T: Decision>(raw: &str) -> Result<Judgment<T>, DecodeError> {
    let kind = T::KIND;
    let body = strip_fence(raw);

    let value: JsonValue = serde_json::from_str(body).map_err(|e| DecodeError::InvalidJson {
        kind,
        reason: e.to_string(),
    })?;

    let validator = get_validator(kind)?;
    let errors: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();
    if !errors.is_empty() {
        return Err(DecodeError::Schema { kind, errors });
    }

    // The schema guarantees a non-empty string under the score key
    let token = value[kind.score_key()].as_str().unwrap_or_default();
    let decision: T = token.parse()?;

    let explanation = value["explanation"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(Judgment::new(decision, explanation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragloop_core::{GroundingVerdict, RelevanceVerdict, RouteDecision, UsefulnessVerdict};

    #[test]
    fn test_decodes_route() {
        let judgment: Judgment<RouteDecision> = decode(r#"{"datasource": "vectorstore"}"#).unwrap();
        assert_eq!(judgment.value, RouteDecision::EvidenceStore);
        assert!(!judgment.defaulted);
        assert!(judgment.explanation.is_none());
    }

    #[test]
    fn test_decodes_grade_with_explanation() {
        let judgment: Judgment<GroundingVerdict> = decode(
            r#"{"binary_score": "No", "explanation": "The answer cites a figure absent from the facts."}"#,
        )
        .unwrap();
        assert_eq!(judgment.value, GroundingVerdict::NotGrounded);
        assert_eq!(
            judgment.explanation.as_deref(),
            Some("The answer cites a figure absent from the facts.")
        );
    }

    #[test]
    fn test_strips_code_fence() {
        let raw = "```json\n{\"binary_score\": \"yes\"}\n```";
        let judgment: Judgment<RelevanceVerdict> = decode(raw).unwrap();
        assert_eq!(judgment.value, RelevanceVerdict::Relevant);

        assert_eq!(strip_fence("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn test_rejects_prose() {
        let err = decode::<UsefulnessVerdict>("Sure! The answer is useful: yes").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InvalidJson {
                kind: JudgmentKind::Usefulness,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_wrong_key() {
        let err = decode::<RouteDecision>(r#"{"binary_score": "yes"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Schema { kind: JudgmentKind::Route, .. }));

        let err = decode::<GroundingVerdict>(r#"{"binary_score": true}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Schema { .. }));
    }

    #[test]
    fn test_rejects_non_object() {
        let err = decode::<RelevanceVerdict>(r#"["yes"]"#).unwrap_err();
        assert!(matches!(err, DecodeError::Schema { .. }));
    }

    #[test]
    fn test_rejects_unknown_token() {
        let err = decode::<RelevanceVerdict>(r#"{"binary_score": "partially"}"#).unwrap_err();
        match err {
            DecodeError::UnknownToken(e) => assert_eq!(e.token, "partially"),
            other => panic!("Expected UnknownToken, got {:?}", other),
        }
    }
}
