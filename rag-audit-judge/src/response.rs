//! Parsing of the judge's structured reply.
//!
//! The reply must contain one JSON object with the three integer scores. It
//! may be wrapped in a markdown code fence or surrounded by prose. Scores
//! that are missing, non-integer or outside 1..=5 make the reply malformed.

use rag_audit_core::QualityScores;
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default, alias = "relevance")]
    relevance_score: Option<Value>,
    #[serde(default, alias = "completeness")]
    completeness_score: Option<Value>,
    #[serde(default, alias = "factual_accuracy", alias = "accuracy")]
    factual_accuracy_score: Option<Value>,
    #[serde(default, alias = "explanation", alias = "rationale")]
    reasoning: Option<String>,
}

/// Narrows `text` to the outermost `{ ... }` span, dropping code fences and
/// any prose around the object.
fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn score(field: &str, value: Option<&Value>) -> Result<u8, String> {
    let value = value.ok_or_else(|| format!("missing {field}"))?;
    let number = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| format!("{field} is not an integer score: {value}"))
}

/// Reads the judge's reply into scores, or explains why it is malformed.
pub fn parse_verdict(reply: &str) -> Result<QualityScores, String> {
    let body = object_span(reply).ok_or_else(|| "reply contains no JSON object".to_string())?;
    let verdict: Verdict =
        serde_json::from_str(body).map_err(|e| format!("reply is not valid JSON: {e}"))?;

    let scores = QualityScores::new(
        score("relevance_score", verdict.relevance_score.as_ref())?,
        score("completeness_score", verdict.completeness_score.as_ref())?,
        score("factual_accuracy_score", verdict.factual_accuracy_score.as_ref())?,
        verdict.reasoning.unwrap_or_default().trim(),
    );

    scores
        .validate()
        .map_err(|e| format!("score out of range: {e}"))?;

    Ok(scores)
}
