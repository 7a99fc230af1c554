//! Plain-text analysis report and canned follow-up questions.

use super::{DocumentRecord, DocumentType};
use std::fmt::Write as _;

const RULE_WIDTH: usize = 50;

/// Render the downloadable analysis report for a stored document.
pub fn render_report(record: &DocumentRecord, generated_at: &str) -> String {
    let analysis = &record.analysis;
    let mut report = String::new();

    let _ = writeln!(report, "LEGA.AI DOCUMENT ANALYSIS REPORT");
    let _ = writeln!(report, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(report);
    let _ = writeln!(report, "Document: {}", record.filename);
    let _ = writeln!(report, "Type: {}", analysis.document_type.label());
    let _ = writeln!(report, "Analysis Date: {generated_at}");
    let _ = writeln!(report, "Risk Score: {}/100", analysis.risk_score);
    let _ = writeln!(report);
    let _ = writeln!(report, "SUMMARY:");
    let _ = writeln!(report, "{}", or_placeholder(&analysis.summary, "No summary available"));
    let _ = writeln!(report);
    let _ = writeln!(report, "RISK ASSESSMENT:");
    let _ = writeln!(
        report,
        "{}",
        or_placeholder(&analysis.overall_assessment, "No risk assessment available")
    );
    let _ = writeln!(report);
    let _ = writeln!(report, "RISK FACTORS:");

    for (index, factor) in analysis.risk_factors.iter().enumerate() {
        let _ = writeln!(report);
        let _ = writeln!(
            report,
            "{}. {} RISK",
            index + 1,
            factor.severity.as_str().to_uppercase()
        );
        let _ = writeln!(report, "   Category: {}", capitalize(factor.category.as_str()));
        let _ = writeln!(report, "   Clause: {}", factor.clause_text);
        let _ = writeln!(report, "   Explanation: {}", factor.explanation);
        if let Some(suggestion) = &factor.suggestion {
            let _ = writeln!(report, "   Suggestion: {suggestion}");
        }
    }

    let _ = writeln!(report);
    let _ = writeln!(report, "SIMPLIFIED VERSION:");
    let _ = writeln!(
        report,
        "{}",
        or_placeholder(&analysis.simplified_text, "No simplified version available")
    );
    let _ = writeln!(report);
    let _ = writeln!(report, "KEY POINTS:");
    for point in &analysis.key_points {
        let _ = writeln!(report, "• {point}");
    }

    if !analysis.key_dates.is_empty() {
        let _ = writeln!(report);
        let _ = writeln!(report, "KEY DATES:");
        for date in &analysis.key_dates {
            let _ = writeln!(report, "• {}", date.date);
        }
    }

    if !analysis.financial_terms.amounts.is_empty() {
        let _ = writeln!(report);
        let _ = writeln!(report, "AMOUNTS:");
        for amount in &analysis.financial_terms.amounts {
            let _ = writeln!(report, "• {amount}");
        }
    }

    let _ = writeln!(report);
    let _ = write!(report, "Generated by Lega.AI - Making legal documents accessible");
    report
}

/// Render the question-and-answer history of a document as plain text.
pub fn render_qa_transcript(record: &DocumentRecord, exported_at: &str) -> String {
    let mut transcript = String::new();

    let _ = writeln!(transcript, "LEGA.AI Q&A SESSION EXPORT");
    let _ = writeln!(transcript, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(transcript);
    let _ = writeln!(transcript, "Document: {}", record.filename);
    let _ = writeln!(transcript, "Document Type: {}", record.analysis.document_type.label());
    let _ = writeln!(transcript, "Export Date: {exported_at}");
    let _ = writeln!(transcript);
    let _ = writeln!(transcript, "QUESTIONS & ANSWERS:");
    let _ = writeln!(transcript, "{}", "=".repeat(RULE_WIDTH));

    for (index, exchange) in record.qa_history.iter().enumerate() {
        let _ = writeln!(transcript);
        let _ = writeln!(transcript, "Q{}: {}", index + 1, exchange.question);
        let _ = writeln!(transcript);
        let _ = writeln!(transcript, "A{}: {}", index + 1, exchange.answer);
        let _ = writeln!(transcript);
        let _ = writeln!(transcript, "{}", "-".repeat(30));
    }

    let _ = writeln!(transcript);
    let _ = write!(transcript, "Generated by Lega.AI - Making legal documents accessible");
    transcript
}

/// Download name for a report: `lega_ai_report_<stem>.txt`.
pub fn report_filename(original: &str) -> String {
    format!("lega_ai_report_{}.txt", download_stem(original))
}

/// Download name for a Q&A transcript: `lega_ai_qa_<stem>.txt`.
pub fn transcript_filename(original: &str) -> String {
    format!("lega_ai_qa_{}.txt", download_stem(original))
}

fn download_stem(original: &str) -> String {
    let lower = original.to_lowercase();
    let stem = [".pdf", ".docx", ".doc", ".txt"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &original[..original.len() - ext.len()])
        .unwrap_or(original);
    super::sanitize_filename(stem)
}

/// Questions worth asking about a document of the given type.
pub fn suggested_questions(document_type: DocumentType) -> &'static [&'static str] {
    match document_type {
        DocumentType::Rental => &[
            "What is the monthly rent amount?",
            "What happens if I pay rent late?",
            "How much is the security deposit?",
            "Can I terminate the lease early?",
            "Who is responsible for repairs?",
            "What are the landlord's obligations?",
            "Are pets allowed in the property?",
            "What happens if I damage the property?",
        ],
        DocumentType::Loan => &[
            "What is the total amount I will repay?",
            "What is the effective interest rate?",
            "What happens if I miss a payment?",
            "What collateral is required?",
            "Can I repay the loan early?",
            "What are the processing fees?",
            "How is the interest calculated?",
            "What happens in case of default?",
        ],
        DocumentType::Employment => &[
            "What is my total compensation package?",
            "How many hours am I expected to work?",
            "Can the company terminate me without notice?",
            "What are the non-compete restrictions?",
            "Am I allowed to work other jobs?",
            "What benefits am I entitled to?",
            "How much notice must I give to resign?",
            "Who owns the intellectual property I create?",
        ],
        DocumentType::Nda => &[
            "What information is considered confidential?",
            "How long does the confidentiality last?",
            "What are the penalties for disclosure?",
            "Can I discuss this agreement with others?",
            "What happens after the agreement ends?",
            "Are there any exceptions to confidentiality?",
        ],
        DocumentType::Service => &[
            "What services are included in this agreement?",
            "What is the payment schedule?",
            "How can this agreement be terminated?",
            "What are the deliverables and deadlines?",
            "Who is responsible for what costs?",
            "What happens if the work is unsatisfactory?",
        ],
        DocumentType::Other => &[
            "What are the main obligations for each party?",
            "What are the key financial terms?",
            "How can this agreement be terminated?",
            "What are the potential risks for me?",
            "What should I be most careful about?",
            "Are there any unusual or concerning clauses?",
        ],
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        DocumentAnalysis, DocumentMetadata, FinancialTerms, RiskCategory, RiskFactor, RiskLevel,
    };
    use crate::extraction::FileKind;

    fn sample_record() -> DocumentRecord {
        DocumentRecord {
            id: "doc-1".into(),
            filename: "Flat Lease.pdf".into(),
            file_path: "uploads/doc-1_Flat_Lease.pdf".into(),
            file_kind: FileKind::Pdf,
            file_size: 2048,
            file_hash: "abc".into(),
            upload_timestamp: "2024-06-01T10:00:00Z".into(),
            text: "Lease text".into(),
            metadata: DocumentMetadata::default(),
            analysis: DocumentAnalysis {
                document_type: DocumentType::Rental,
                risk_score: 23,
                overall_assessment: "Moderate risk.".into(),
                summary: "A one year lease.".into(),
                simplified_text: String::new(),
                key_points: vec!["Pay rent by the 5th".into()],
                jargon_definitions: Default::default(),
                risk_factors: vec![RiskFactor {
                    id: "risk_1".into(),
                    clause_text: "Late fee of 10% per day".into(),
                    category: RiskCategory::Financial,
                    severity: RiskLevel::High,
                    explanation: "Penalty compounds quickly".into(),
                    suggestion: Some("Cap the late fee".into()),
                    position: None,
                }],
                key_dates: Vec::new(),
                financial_terms: FinancialTerms {
                    amounts: vec!["₹25,000".into()],
                    ..Default::default()
                },
                created_at: "2024-06-01T10:00:05Z".into(),
            },
            qa_history: Vec::new(),
            indexed: true,
        }
    }

    #[test]
    fn report_lists_sections_and_factors() {
        let report = render_report(&sample_record(), "2024-06-02T09:00:00Z");
        assert!(report.starts_with("LEGA.AI DOCUMENT ANALYSIS REPORT"));
        assert!(report.contains("Document: Flat Lease.pdf"));
        assert!(report.contains("Type: Rental"));
        assert!(report.contains("1. HIGH RISK"));
        assert!(report.contains("   Category: Financial"));
        assert!(report.contains("   Suggestion: Cap the late fee"));
        assert!(report.contains("No simplified version available"));
        assert!(report.contains("• Pay rent by the 5th"));
        assert!(report.contains("• ₹25,000"));
        assert!(report.ends_with("Making legal documents accessible"));
    }

    #[test]
    fn transcript_numbers_exchanges() {
        let mut record = sample_record();
        record.qa_history = vec![
            crate::document::QaExchange {
                id: "q1".into(),
                question: "How much is the deposit?".into(),
                answer: "Two months of rent.".into(),
                timestamp: "2024-06-01T11:00:00Z".into(),
            },
            crate::document::QaExchange {
                id: "q2".into(),
                question: "Can I sublet?".into(),
                answer: "Only with written consent.".into(),
                timestamp: "2024-06-01T11:05:00Z".into(),
            },
        ];

        let transcript = render_qa_transcript(&record, "2024-06-02T09:00:00Z");
        assert!(transcript.starts_with("LEGA.AI Q&A SESSION EXPORT"));
        assert!(transcript.contains("Document Type: Rental"));
        assert!(transcript.contains("Q1: How much is the deposit?"));
        assert!(transcript.contains("A2: Only with written consent."));
        assert_eq!(transcript_filename("Flat Lease.pdf"), "lega_ai_qa_Flat_Lease.txt");
    }

    #[test]
    fn report_filename_drops_known_extensions() {
        assert_eq!(report_filename("Flat Lease.PDF"), "lega_ai_report_Flat_Lease.txt");
        assert_eq!(report_filename("offer.docx"), "lega_ai_report_offer.txt");
        assert_eq!(report_filename("notes"), "lega_ai_report_notes.txt");
    }

    #[test]
    fn every_type_has_suggestions() {
        for doc_type in [
            DocumentType::Rental,
            DocumentType::Loan,
            DocumentType::Employment,
            DocumentType::Nda,
            DocumentType::Service,
            DocumentType::Other,
        ] {
            assert!(suggested_questions(doc_type).len() >= 6);
        }
    }
}
