//! AI-backed document analysis: risk review, plain-language rewrite, summary, and Q&A.
//!
//! Each task is one prompt sent through an [`LlmClient`]. Responses that should be JSON are
//! parsed leniently: markdown fences are stripped, missing keys get defaults, and an unparseable
//! risk response falls back to a keyword scan of the model's prose. The upload-time tasks degrade
//! to placeholder text when the model is unreachable or misbehaves, but a missing or rejected
//! API key is returned to the caller: no record should be built on analyses that never ran.

mod parse;
mod prompts;

pub use parse::extract_json_block;

use crate::document::{
    ClausePosition, DocumentType, RiskCategory, RiskFactor, RiskLevel, truncate_chars,
};
use crate::llm::{LlmClient, LlmError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

const FAILED_ASSESSMENT: &str = "Analysis failed";
const SUMMARY_UNAVAILABLE: &str = "Unable to generate summary";

/// Risk factor as proposed by the model, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRiskFactor {
    /// Quoted clause.
    #[serde(default)]
    pub clause_text: String,
    /// Category name, validated later.
    #[serde(default)]
    pub category: Option<String>,
    /// Severity name, validated later.
    #[serde(default)]
    pub severity: Option<String>,
    /// Why the clause is risky.
    #[serde(default)]
    pub explanation: String,
    /// Suggested change.
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// Outcome of the risk review.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAnalysis {
    /// Clauses the model flagged.
    pub risk_factors: Vec<RawRiskFactor>,
    /// Overall verdict.
    pub overall_assessment: String,
}

/// Plain-language rewrite of a document or passage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimplificationResult {
    /// Rewritten text.
    pub simplified_text: String,
    /// Main points.
    pub key_points: Vec<String>,
    /// Legal term to plain definition.
    pub jargon_definitions: BTreeMap<String, String>,
}

/// Runs analysis prompts against a text-generation backend.
#[derive(Clone)]
pub struct AiAnalyzer {
    llm: Arc<dyn LlmClient>,
}

impl AiAnalyzer {
    /// Wrap a text-generation client.
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Ask the model for risky clauses; only credential errors are returned.
    pub async fn analyze_risk(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<RiskAnalysis, LlmError> {
        let started = Instant::now();
        tracing::info!(task = "risk_analysis", "Analysis started");

        let analysis = match self.llm.generate(&prompts::risk_prompt(text, document_type)).await {
            Ok(response) => parse::parse_risk_response(&response).unwrap_or_else(|| {
                tracing::warn!("Falling back to keyword risk extraction");
                parse::risk_fallback(&response)
            }),
            Err(error) if error.is_credentials_error() => return Err(error),
            Err(error) => {
                tracing::error!(error = %error, "Risk analysis failed");
                RiskAnalysis {
                    risk_factors: Vec::new(),
                    overall_assessment: FAILED_ASSESSMENT.to_string(),
                }
            }
        };

        tracing::info!(
            task = "risk_analysis",
            factors = analysis.risk_factors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );
        Ok(analysis)
    }

    /// Rewrite text in plain language; only credential errors are returned.
    pub async fn simplify(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<SimplificationResult, LlmError> {
        let started = Instant::now();
        let result = match self
            .llm
            .generate(&prompts::simplification_prompt(text, document_type))
            .await
        {
            Ok(response) => parse::parse_simplification(&response, text).unwrap_or_else(|| {
                SimplificationResult {
                    simplified_text: format!(
                        "{}... (Full simplification unavailable)",
                        truncate_chars(text, 500)
                    ),
                    key_points: vec!["Document content requires legal review".into()],
                    jargon_definitions: BTreeMap::new(),
                }
            }),
            Err(error) if error.is_credentials_error() => return Err(error),
            Err(error) => {
                tracing::error!(error = %error, "Text simplification failed");
                SimplificationResult {
                    simplified_text: format!("{}...", truncate_chars(text, 500)),
                    key_points: vec!["Simplification failed - showing original text".into()],
                    jargon_definitions: BTreeMap::new(),
                }
            }
        };

        tracing::info!(
            task = "simplification",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis completed"
        );
        Ok(result)
    }

    /// Short summary of the document; only credential errors are returned.
    pub async fn summarize(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<String, LlmError> {
        match self
            .llm
            .generate(&prompts::summary_prompt(text, document_type))
            .await
        {
            Ok(summary) => Ok(summary.trim().to_string()),
            Err(error) if error.is_credentials_error() => Err(error),
            Err(error) => {
                tracing::error!(error = %error, "Summary generation failed");
                Ok(SUMMARY_UNAVAILABLE.to_string())
            }
        }
    }

    /// Answer a question from the supplied document context.
    pub async fn answer_question(
        &self,
        question: &str,
        context: &str,
        document_type: DocumentType,
    ) -> Result<String, LlmError> {
        let answer = self
            .llm
            .generate(&prompts::question_prompt(question, context, document_type))
            .await?;
        Ok(answer.trim().to_string())
    }
}

/// Validate raw factors: assign ids, coerce unknown labels, locate clauses in `text`.
///
/// Unknown categories become `standard`, unknown severities `low`. At most `cap` factors are
/// kept. Positions are character offsets into `text`, not byte offsets.
pub fn create_risk_factors(raw: &[RawRiskFactor], text: &str, cap: usize) -> Vec<RiskFactor> {
    raw.iter()
        .take(cap)
        .enumerate()
        .map(|(index, factor)| {
            let category = factor
                .category
                .as_deref()
                .and_then(|value| value.parse().ok())
                .unwrap_or(RiskCategory::Standard);
            let severity = factor
                .severity
                .as_deref()
                .and_then(|value| value.parse().ok())
                .unwrap_or(RiskLevel::Low);
            let position = (!factor.clause_text.is_empty())
                .then(|| text.find(&factor.clause_text))
                .flatten()
                .map(|byte_start| {
                    let start_index = text[..byte_start].chars().count();
                    ClausePosition {
                        start_index,
                        end_index: start_index + factor.clause_text.chars().count(),
                        page_number: None,
                    }
                });

            RiskFactor {
                id: format!("risk_{}", index + 1),
                clause_text: factor.clause_text.clone(),
                category,
                severity,
                explanation: factor.explanation.clone(),
                suggestion: factor.suggestion.clone().filter(|s| !s.trim().is_empty()),
                position,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;

    fn analyzer(llm: ScriptedLlm) -> AiAnalyzer {
        AiAnalyzer::new(Arc::new(llm))
    }

    #[tokio::test]
    async fn risk_analysis_parses_json() {
        let llm = ScriptedLlm::replying(
            r#"```json
            {"risk_factors": [{"clause_text": "non-refundable deposit", "category": "financial",
              "severity": "high", "explanation": "You lose it", "suggestion": "Ask for refund terms"}],
             "overall_assessment": "High risk lease"}
            ```"#,
        );
        let result = analyzer(llm)
            .analyze_risk("The non-refundable deposit is due.", DocumentType::Rental)
            .await
            .expect("analysis");

        assert_eq!(result.overall_assessment, "High risk lease");
        assert_eq!(result.risk_factors.len(), 1);
        assert_eq!(result.risk_factors[0].severity.as_deref(), Some("high"));
    }

    #[tokio::test]
    async fn risk_analysis_falls_back_on_prose() {
        let llm = ScriptedLlm::replying(
            "There is a significant penalty for breaking the lease early. Otherwise fine.",
        );
        let result = analyzer(llm)
            .analyze_risk("text", DocumentType::Rental)
            .await
            .expect("analysis");

        assert_eq!(
            result.overall_assessment,
            "Risk analysis completed with limited parsing. Please review manually."
        );
        assert_eq!(result.risk_factors.len(), 1);
    }

    #[tokio::test]
    async fn risk_analysis_reports_transport_failure() {
        let llm = ScriptedLlm::new(|_| Err(LlmError::ProviderUnavailable("down".into())));
        let result = analyzer(llm)
            .analyze_risk("text", DocumentType::Loan)
            .await
            .expect("analysis");

        assert_eq!(result.overall_assessment, "Analysis failed");
        assert!(result.risk_factors.is_empty());
    }

    #[tokio::test]
    async fn simplify_handles_each_outcome() {
        let text = "x".repeat(600);

        let ok = analyzer(ScriptedLlm::replying(
            r#"{"simplified_text": "You pay rent.", "key_points": ["Rent"], "jargon_definitions": {}}"#,
        ))
        .simplify(&text, DocumentType::Rental)
        .await
        .expect("simplified");
        assert_eq!(ok.simplified_text, "You pay rent.");

        let unparsed = analyzer(ScriptedLlm::replying("Plain words, no JSON"))
            .simplify(&text, DocumentType::Rental)
            .await
            .expect("simplified");
        assert!(unparsed.simplified_text.ends_with("... (Full simplification unavailable)"));
        assert!(unparsed.simplified_text.starts_with(&"x".repeat(500)));
        assert_eq!(unparsed.key_points, vec!["Document content requires legal review"]);

        let failed = analyzer(ScriptedLlm::new(|_| {
            Err(LlmError::ProviderUnavailable("down".into()))
        }))
        .simplify(&text, DocumentType::Rental)
        .await
        .expect("simplified");
        assert_eq!(failed.simplified_text, format!("{}...", "x".repeat(500)));
    }

    #[tokio::test]
    async fn summary_trims_or_reports_failure() {
        let summary = analyzer(ScriptedLlm::replying("  A loan of ₹5,00,000.  \n"))
            .summarize("text", DocumentType::Loan)
            .await
            .expect("summary");
        assert_eq!(summary, "A loan of ₹5,00,000.");

        let failed = analyzer(ScriptedLlm::new(|_| {
            Err(LlmError::GenerationFailed("500".into()))
        }))
        .summarize("text", DocumentType::Loan)
        .await
        .expect("summary");
        assert_eq!(failed, "Unable to generate summary");
    }

    #[tokio::test]
    async fn rejected_key_is_returned_from_every_upload_task() {
        let rejected = || {
            analyzer(ScriptedLlm::new(|_| {
                Err(LlmError::Unauthorized("API key not valid".into()))
            }))
        };

        let risk = rejected().analyze_risk("text", DocumentType::Rental).await;
        assert!(matches!(risk, Err(LlmError::Unauthorized(_))));
        let simplified = rejected().simplify("text", DocumentType::Rental).await;
        assert!(matches!(simplified, Err(LlmError::Unauthorized(_))));
        let summary = rejected().summarize("text", DocumentType::Rental).await;
        assert!(matches!(summary, Err(LlmError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn answer_question_propagates_errors() {
        let llm = ScriptedLlm::new(|prompt| {
            assert!(prompt.contains("Question: Is there a lock-in?"));
            Ok(" Yes, 11 months. ".into())
        });
        let answer = analyzer(llm)
            .answer_question("Is there a lock-in?", "Lock-in of 11 months.", DocumentType::Rental)
            .await
            .expect("answer");
        assert_eq!(answer, "Yes, 11 months.");

        let error = analyzer(ScriptedLlm::new(|_| Err(LlmError::MissingCredentials)))
            .answer_question("q", "c", DocumentType::Other)
            .await
            .expect_err("error");
        assert!(matches!(error, LlmError::MissingCredentials));
    }

    #[test]
    fn create_risk_factors_normalizes_labels_and_positions() {
        let text = "Rent is due monthly. A late fee of 10% applies daily.";
        let raw = vec![
            RawRiskFactor {
                clause_text: "A late fee of 10% applies daily".into(),
                category: Some("financial".into()),
                severity: Some("HIGH".into()),
                explanation: "Adds up".into(),
                suggestion: Some("Cap it".into()),
            },
            RawRiskFactor {
                clause_text: "Paraphrased clause".into(),
                category: Some("mystery".into()),
                severity: Some("extreme".into()),
                ..Default::default()
            },
        ];

        let factors = create_risk_factors(&raw, text, 10);
        assert_eq!(factors.len(), 2);
        assert_eq!(factors[0].id, "risk_1");
        assert_eq!(factors[0].category, RiskCategory::Financial);
        assert_eq!(factors[0].severity, RiskLevel::High);
        let position = factors[0].position.expect("position");
        assert_eq!(&text[position.start_index..position.end_index], raw[0].clause_text);

        assert_eq!(factors[1].id, "risk_2");
        assert_eq!(factors[1].category, RiskCategory::Standard);
        assert_eq!(factors[1].severity, RiskLevel::Low);
        assert!(factors[1].position.is_none());
    }

    #[test]
    fn clause_positions_count_characters() {
        let text = "Deposit ₹50,000. The deposit is non-refundable.";
        let raw = vec![RawRiskFactor {
            clause_text: "The deposit is non-refundable".into(),
            ..Default::default()
        }];

        let position = create_risk_factors(&raw, text, 5)[0]
            .position
            .expect("position");
        assert_eq!(position.start_index, 17);
        assert_eq!(position.end_index, 46);
        let located: String = text
            .chars()
            .skip(position.start_index)
            .take(position.end_index - position.start_index)
            .collect();
        assert_eq!(located, raw[0].clause_text);
    }

    #[test]
    fn create_risk_factors_respects_cap() {
        let raw = vec![RawRiskFactor::default(); 4];
        let factors = create_risk_factors(&raw, "", 2);
        assert_eq!(factors.len(), 2);
        assert!(factors.iter().all(|f| f.position.is_none()));
    }
}
