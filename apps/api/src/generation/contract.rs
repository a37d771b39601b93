//! Output contracts. Coerce untrusted model JSON into values with fixed shape guarantees.
//!
//! Pure and total: every function returns either a normalized value or a
//! `ContractError`; nothing here panics on malformed-but-parseable input.
//!
//! # Contracts
//! - Full document (generation, stage 3, custom instruction): `profile`, `workExperiences`,
//!   `educations`, `skills` required; `projects` / `custom` default to empty;
//!   `skills.featuredSkills` normalized to exactly 6 entries.
//! - Match analysis (stage 1): numeric `score` clamped to [0, 100] and rounded;
//!   `missingKeywords` truncated to 5.
//! - Experience rewrite (stage 2): `workExperiences` array whose length equals the input count.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::llm_client::strip_json_fences;
use crate::models::resume::{normalize_featured_skills, Custom, ResumeDocument, WorkExperience};

pub const MAX_MISSING_KEYWORDS: usize = 5;

const REQUIRED_SECTIONS: [&str; 4] = ["profile", "workExperiences", "educations", "skills"];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("unexpected format: {0}")]
    UnexpectedFormat(String),

    #[error("incomplete document, missing: {0:?}")]
    IncompleteDocument(Vec<&'static str>),
}

/// Stage-1 result after clamping and truncation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchAnalysis {
    pub score: u8,
    pub missing_keywords: Vec<String>,
}

/// Parses raw model text into a JSON object, tolerating markdown code fences.
pub fn parse_reply(raw: &str) -> Result<Map<String, Value>, ContractError> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| ContractError::UnexpectedFormat(format!("reply is not valid JSON: {e}")))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ContractError::UnexpectedFormat(format!(
            "reply is a JSON {}, not an object",
            json_kind(&other)
        ))),
    }
}

/// Full-document contract used by generation, stage 3 and custom instructions.
pub fn validate_document(mut reply: Map<String, Value>) -> Result<ResumeDocument, ContractError> {
    let missing: Vec<&'static str> = REQUIRED_SECTIONS
        .into_iter()
        .filter(|section| is_absent(reply.get(*section)))
        .collect();
    if !missing.is_empty() {
        return Err(ContractError::IncompleteDocument(missing));
    }

    if is_absent(reply.get("projects")) {
        reply.insert("projects".to_string(), Value::Array(Vec::new()));
    }
    if is_absent(reply.get("custom")) {
        reply.insert("custom".to_string(), to_value(Custom::default()));
    }

    let mut document: ResumeDocument = decode(Value::Object(reply), "resume")?;
    normalize_featured_skills(&mut document.skills.featured_skills);
    Ok(document)
}

/// Stage-1 contract. Out-of-range scores are clamped, never rejected.
pub fn validate_match_analysis(reply: &Map<String, Value>) -> Result<MatchAnalysis, ContractError> {
    let score = reply
        .get("score")
        .and_then(Value::as_f64)
        .ok_or_else(|| ContractError::UnexpectedFormat("`score` must be a number".to_string()))?;

    let mut missing_keywords: Vec<String> = match reply.get("missingKeywords") {
        Some(keywords @ Value::Array(_)) => decode(keywords.clone(), "missingKeywords")?,
        _ => {
            return Err(ContractError::UnexpectedFormat(
                "`missingKeywords` must be an array".to_string(),
            ))
        }
    };
    missing_keywords.truncate(MAX_MISSING_KEYWORDS);

    Ok(MatchAnalysis {
        score: clamp_score(score),
        missing_keywords,
    })
}

/// Stage-2 contract. The rewrite replaces the section wholesale, so the entry count
/// must match the input or entries would be silently dropped or invented.
pub fn validate_experience_rewrite(
    reply: &Map<String, Value>,
    original: &[WorkExperience],
) -> Result<Vec<WorkExperience>, ContractError> {
    let rewritten: Vec<WorkExperience> = match reply.get("workExperiences") {
        Some(entries @ Value::Array(_)) => decode(entries.clone(), "workExperiences")?,
        _ => {
            return Err(ContractError::UnexpectedFormat(
                "`workExperiences` must be an array".to_string(),
            ))
        }
    };

    if rewritten.len() != original.len() {
        return Err(ContractError::UnexpectedFormat(format!(
            "expected {} work experiences, got {}",
            original.len(),
            rewritten.len()
        )));
    }

    for (index, (before, after)) in original.iter().zip(&rewritten).enumerate() {
        if before.company != after.company
            || before.job_title != after.job_title
            || before.date != after.date
        {
            warn!(
                "Rewrite changed identity of work experience {}: {:?}/{:?} -> {:?}/{:?}",
                index, before.company, before.job_title, after.company, after.job_title
            );
        }
    }

    Ok(rewritten)
}

fn clamp_score(score: f64) -> u8 {
    score.clamp(0.0, 100.0).round() as u8
}

fn is_absent(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ContractError> {
    serde_json::from_value(value)
        .map_err(|e| ContractError::UnexpectedFormat(format!("`{what}` has the wrong shape: {e}")))
}

fn to_value<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
