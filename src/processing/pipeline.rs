//! Upload-to-analysis steps shared by the HTTP service and the command-line analyzer.

use crate::{
    analysis::{AiAnalyzer, create_risk_factors},
    document::{
        DocumentAnalysis, DocumentRecord, calculate_risk_score, detect_document_type,
        extract_financial_terms, extract_key_dates, extract_metadata, file_hash, now_rfc3339,
    },
    extraction::{FileKind, UploadLimits, extract_text, validate_upload},
    llm::LlmError,
    processing::types::ProcessingError,
};

/// Validate an upload and extract its text; empty text is an error.
pub async fn read_upload(
    filename: &str,
    content: &[u8],
    limits: &UploadLimits,
) -> Result<(FileKind, String), ProcessingError> {
    let kind = validate_upload(filename, content.len() as u64, limits)?;
    let text = extract_text(kind, content.to_vec()).await?;
    if text.trim().is_empty() {
        tracing::warn!(filename, "No text extracted from upload");
        return Err(ProcessingError::EmptyDocument);
    }
    Ok((kind, text))
}

/// Detect the type, run the three AI tasks concurrently, and add the local text heuristics.
///
/// Fails only when the AI service refuses the credentials.
pub async fn build_analysis(
    analyzer: &AiAnalyzer,
    text: &str,
    max_risk_factors: usize,
) -> Result<DocumentAnalysis, LlmError> {
    let document_type = detect_document_type(text);
    tracing::debug!(document_type = %document_type, "Detected document type");

    let (risk, simplified, summary) = tokio::join!(
        analyzer.analyze_risk(text, document_type),
        analyzer.simplify(text, document_type),
        analyzer.summarize(text, document_type),
    );

    let (risk, simplified, summary) = (risk?, simplified?, summary?);

    let risk_factors = create_risk_factors(&risk.risk_factors, text, max_risk_factors);
    let risk_score = calculate_risk_score(risk_factors.iter().map(|factor| factor.severity));

    Ok(DocumentAnalysis {
        document_type,
        risk_score,
        overall_assessment: risk.overall_assessment,
        summary,
        simplified_text: simplified.simplified_text,
        key_points: simplified.key_points,
        jargon_definitions: simplified.jargon_definitions,
        risk_factors,
        key_dates: extract_key_dates(text),
        financial_terms: extract_financial_terms(text),
        created_at: now_rfc3339(),
    })
}

/// Fields of a new record that are known before it is stored.
pub struct NewRecord<'a> {
    /// Record id.
    pub id: String,
    /// Name as uploaded.
    pub filename: &'a str,
    /// Where the raw bytes were written.
    pub file_path: String,
    /// Source format.
    pub kind: FileKind,
    /// Raw upload.
    pub content: &'a [u8],
    /// Extracted text.
    pub text: String,
    /// Analysis results.
    pub analysis: DocumentAnalysis,
}

impl NewRecord<'_> {
    /// Assemble the record; it starts out unindexed with no Q&A history.
    pub fn into_record(self) -> DocumentRecord {
        DocumentRecord {
            id: self.id,
            filename: self.filename.to_string(),
            file_path: self.file_path,
            file_kind: self.kind,
            file_size: self.content.len() as u64,
            file_hash: file_hash(self.content),
            upload_timestamp: now_rfc3339(),
            metadata: extract_metadata(&self.text),
            text: self.text,
            analysis: self.analysis,
            qa_history: Vec::new(),
            indexed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentType, RiskLevel};
    use crate::llm::testing::ScriptedLlm;
    use std::sync::Arc;

    const LEASE: &str = "This lease is between the landlord and the tenant. \
        The tenant pays rent of ₹25,000 on 01/05/2024. \
        A late fee of 10% per day applies to unpaid rent. The deposit is non-refundable.";

    fn lease_llm() -> ScriptedLlm {
        ScriptedLlm::new(|prompt| {
            if prompt.contains("\"risk_factors\"") {
                Ok(r#"{"risk_factors": [
                    {"clause_text": "A late fee of 10% per day applies to unpaid rent",
                     "category": "financial", "severity": "high", "explanation": "Compounds"},
                    {"clause_text": "The deposit is non-refundable",
                     "category": "financial", "severity": "critical", "explanation": "Lost"}
                ], "overall_assessment": "High risk"}"#
                    .into())
            } else if prompt.contains("\"simplified_text\"") {
                Ok(r#"{"simplified_text": "You rent a flat.", "key_points": ["Rent"],
                       "jargon_definitions": {"lessee": "tenant"}}"#
                    .into())
            } else {
                Ok("A residential lease.".into())
            }
        })
    }

    #[tokio::test]
    async fn builds_a_complete_analysis() {
        let llm = Arc::new(lease_llm());
        let analyzer = AiAnalyzer::new(llm.clone());

        let analysis = build_analysis(&analyzer, LEASE, 10).await.expect("analysis");

        assert_eq!(llm.prompt_count(), 3);
        assert_eq!(analysis.document_type, DocumentType::Rental);
        assert_eq!(analysis.risk_factors.len(), 2);
        assert_eq!(analysis.risk_factors[1].severity, RiskLevel::Critical);
        assert_eq!(analysis.risk_score, 40);
        assert_eq!(analysis.summary, "A residential lease.");
        assert_eq!(analysis.simplified_text, "You rent a flat.");
        assert_eq!(analysis.overall_assessment, "High risk");
        assert_eq!(analysis.key_dates[0].date, "01/05/2024");
        assert!(analysis.financial_terms.amounts.iter().any(|a| a.contains("25,000")));
    }

    #[tokio::test]
    async fn caps_risk_factors() {
        let analyzer = AiAnalyzer::new(Arc::new(lease_llm()));
        let analysis = build_analysis(&analyzer, LEASE, 1).await.expect("analysis");
        assert_eq!(analysis.risk_factors.len(), 1);
        assert_eq!(analysis.risk_score, 15);
    }

    #[tokio::test]
    async fn rejected_key_fails_the_analysis() {
        let analyzer = AiAnalyzer::new(Arc::new(ScriptedLlm::new(|_| {
            Err(LlmError::Unauthorized("API key not valid".into()))
        })));
        let result = build_analysis(&analyzer, LEASE, 10).await;
        assert!(matches!(result, Err(LlmError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn read_upload_rejects_empty_text() {
        let limits = UploadLimits {
            max_bytes: 1024,
            supported_types: vec!["txt".into()],
        };
        let result = read_upload("blank.txt", b"  \n\t\n", &limits).await;
        assert!(matches!(result, Err(ProcessingError::EmptyDocument)));

        let (kind, text) = read_upload("lease.txt", LEASE.as_bytes(), &limits)
            .await
            .expect("text");
        assert_eq!(kind, FileKind::Txt);
        assert!(text.starts_with("This lease"));

        assert!(matches!(
            read_upload("lease.pdf", b"%PDF", &limits).await,
            Err(ProcessingError::Extraction(_))
        ));
    }

    #[test]
    fn new_record_fills_derived_fields() {
        let analyzer_free = DocumentAnalysis {
            document_type: DocumentType::Other,
            risk_score: 0,
            overall_assessment: String::new(),
            summary: String::new(),
            simplified_text: String::new(),
            key_points: Vec::new(),
            jargon_definitions: Default::default(),
            risk_factors: Vec::new(),
            key_dates: Vec::new(),
            financial_terms: Default::default(),
            created_at: now_rfc3339(),
        };
        let record = NewRecord {
            id: "doc-1".into(),
            filename: "notes.txt",
            file_path: "uploads/doc-1_notes.txt".into(),
            kind: FileKind::Txt,
            content: b"one two three",
            text: "one two three".into(),
            analysis: analyzer_free,
        }
        .into_record();

        assert_eq!(record.file_size, 13);
        assert_eq!(record.metadata.word_count, 3);
        assert_eq!(record.file_hash.len(), 64);
        assert!(!record.indexed);
    }
}
