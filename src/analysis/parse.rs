//! Lenient parsing of model responses into analysis structures.

use super::{RawRiskFactor, RiskAnalysis, SimplificationResult};
use crate::document::truncate_chars;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const FALLBACK_KEYWORDS: [&str; 7] = [
    "risk",
    "problematic",
    "concern",
    "warning",
    "caution",
    "penalty",
    "fee",
];
const FALLBACK_LIMIT: usize = 5;
const FALLBACK_CLAUSE_CHARS: usize = 200;

pub(crate) const DEFAULT_ASSESSMENT: &str = "Analysis completed";
pub(crate) const FALLBACK_ASSESSMENT: &str =
    "Risk analysis completed with limited parsing. Please review manually.";

/// Pull the JSON body out of a response that may be wrapped in markdown fences.
pub fn extract_json_block(response: &str) -> &str {
    let mut body = response;
    if let Some(start) = response.find("```json") {
        let inner = &response[start + "```json".len()..];
        if let Some(end) = inner.find("```") {
            body = &inner[..end];
        }
    }

    let body = body.trim();
    if body.len() >= 6 && body.starts_with("```") && body.ends_with("```") {
        body[3..body.len() - 3].trim()
    } else {
        body
    }
}

fn parse_object(response: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(extract_json_block(response)) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            tracing::warn!("Model response is JSON but not an object");
            None
        }
        Err(error) => {
            tracing::warn!(
                error = %error,
                response = %crate::logging::preview(response, 500),
                "Model response is not valid JSON"
            );
            None
        }
    }
}

/// Parse a risk response; `None` when it is not a JSON object.
pub(crate) fn parse_risk_response(response: &str) -> Option<RiskAnalysis> {
    let mut map = parse_object(response)?;

    let risk_factors = match map.remove("risk_factors") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawRiskFactor>(item) {
                Ok(factor) => Some(factor),
                Err(error) => {
                    tracing::warn!(error = %error, "Skipping malformed risk factor");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    };
    let overall_assessment = match map.remove("overall_assessment") {
        Some(Value::String(text)) => text,
        _ => DEFAULT_ASSESSMENT.to_string(),
    };

    Some(RiskAnalysis {
        risk_factors,
        overall_assessment,
    })
}

/// Scan free text for sentences that read like risk warnings.
pub(crate) fn risk_fallback(response: &str) -> RiskAnalysis {
    let risk_factors = response
        .split('.')
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() > 20)
        .filter(|sentence| {
            let lowered = sentence.to_lowercase();
            FALLBACK_KEYWORDS.iter().any(|kw| lowered.contains(kw))
        })
        .take(FALLBACK_LIMIT)
        .map(|sentence| RawRiskFactor {
            clause_text: truncate_chars(sentence, FALLBACK_CLAUSE_CHARS).to_string(),
            category: Some("standard".into()),
            severity: Some("medium".into()),
            explanation: "Potential risk identified by text analysis".into(),
            suggestion: Some("Review this clause carefully with legal counsel".into()),
        })
        .collect();

    RiskAnalysis {
        risk_factors,
        overall_assessment: FALLBACK_ASSESSMENT.to_string(),
    }
}

/// Parse a simplification response; `None` when it is not a JSON object.
pub(crate) fn parse_simplification(response: &str, text: &str) -> Option<SimplificationResult> {
    let mut map = parse_object(response)?;

    let simplified_text = match map.remove("simplified_text") {
        Some(Value::String(simplified)) => simplified,
        _ => format!("{}...", truncate_chars(text, 500)),
    };
    let key_points = match map.remove("key_points") {
        Some(Value::Array(points)) => points.into_iter().filter_map(value_to_string).collect(),
        Some(Value::String(point)) => vec![point],
        _ => vec!["Unable to extract key points".to_string()],
    };
    let jargon_definitions = match map.remove("jargon_definitions") {
        Some(Value::Object(terms)) => terms
            .into_iter()
            .filter_map(|(term, definition)| value_to_string(definition).map(|d| (term, d)))
            .collect(),
        _ => BTreeMap::new(),
    };

    Some(SimplificationResult {
        simplified_text,
        key_points,
        jargon_definitions,
    })
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
