//! Domain records for uploaded documents and their analyses, plus the local (non-AI) text
//! heuristics: document-type detection, date and money extraction, scoring, and reports.

pub mod classify;
pub mod files;
pub mod report;
pub mod risk;
pub mod terms;

pub use classify::{detect_document_type, extract_metadata};
pub use files::{file_hash, format_age, format_file_size, sanitize_filename};
pub use report::{
    render_qa_transcript, render_report, report_filename, suggested_questions, transcript_filename,
};
pub use risk::{RiskBand, calculate_risk_score};
pub use terms::{extract_financial_terms, extract_key_dates};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Kind of agreement detected from the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Lease or rental agreement.
    Rental,
    /// Loan or credit agreement.
    Loan,
    /// Employment contract or offer letter.
    Employment,
    /// Service or consulting agreement.
    Service,
    /// Non-disclosure agreement.
    Nda,
    /// Anything else.
    Other,
}

impl DocumentType {
    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rental => "rental",
            Self::Loan => "loan",
            Self::Employment => "employment",
            Self::Service => "service",
            Self::Nda => "nda",
            Self::Other => "other",
        }
    }

    /// Human-readable label used in prompts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Rental => "Rental",
            Self::Loan => "Loan",
            Self::Employment => "Employment",
            Self::Service => "Service",
            Self::Nda => "NDA",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rental" => Ok(Self::Rental),
            "loan" => Ok(Self::Loan),
            "employment" => Ok(Self::Employment),
            "service" => Ok(Self::Service),
            "nda" => Ok(Self::Nda),
            "other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

/// Severity assigned to a risky clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Minor concern.
    Low,
    /// Worth reviewing.
    Medium,
    /// Likely to hurt the signer.
    High,
    /// Should not be signed as written.
    Critical,
}

impl RiskLevel {
    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(()),
        }
    }
}

/// Area of exposure a risky clause falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    /// Fees, penalties, costs.
    Financial,
    /// Long-term obligations and exit difficulty.
    Commitment,
    /// Waived protections or limited recourse.
    Rights,
    /// Everything else.
    Standard,
}

impl RiskCategory {
    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::Commitment => "commitment",
            Self::Rights => "rights",
            Self::Standard => "standard",
        }
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "financial" => Ok(Self::Financial),
            "commitment" => Ok(Self::Commitment),
            "rights" => Ok(Self::Rights),
            "standard" => Ok(Self::Standard),
            _ => Err(()),
        }
    }
}

/// Character span of a clause inside the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClausePosition {
    /// Inclusive start, in characters.
    pub start_index: usize,
    /// Exclusive end, in characters.
    pub end_index: usize,
    /// Page number when the extractor reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

/// A clause flagged by the risk analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Identifier unique within one analysis (`risk_1`, `risk_2`, ...).
    pub id: String,
    /// Clause text as quoted by the model.
    pub clause_text: String,
    /// Risk area.
    pub category: RiskCategory,
    /// Severity.
    pub severity: RiskLevel,
    /// Why the clause is risky.
    pub explanation: String,
    /// Suggested change or thing to watch for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Location of the clause in the source text, when found verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ClausePosition>,
}

/// A date mentioned in the document with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDate {
    /// Date as written.
    pub date: String,
    /// Character offset of the match.
    pub position: usize,
    /// Up to 50 characters either side of the match.
    pub context: String,
}

/// Monetary figures found in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialTerms {
    /// Currency amounts (₹, Rs., $).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amounts: Vec<String>,
    /// Every percentage mentioned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub percentages: Vec<String>,
    /// Percentages following an interest-rate phrase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interest_rates: Vec<String>,
}

impl FinancialTerms {
    /// Whether nothing was found.
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty() && self.percentages.is_empty() && self.interest_rates.is_empty()
    }
}

/// Basic size figures for extracted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Whitespace-separated word count.
    pub word_count: usize,
    /// Character count.
    pub character_count: usize,
    /// Minutes at 200 words per minute.
    pub estimated_reading_time: usize,
}

/// Everything the AI service and the local heuristics produced for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    /// Detected agreement type.
    pub document_type: DocumentType,
    /// Weighted severity score, 0 to 100.
    pub risk_score: u8,
    /// One-paragraph risk verdict from the model.
    pub overall_assessment: String,
    /// Short summary of parties, obligations, and terms.
    pub summary: String,
    /// Plain-language rewrite.
    pub simplified_text: String,
    /// Main points of the plain-language rewrite.
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Legal term to plain definition.
    #[serde(default)]
    pub jargon_definitions: BTreeMap<String, String>,
    /// Flagged clauses.
    #[serde(default)]
    pub risk_factors: Vec<RiskFactor>,
    /// Dates found in the text.
    #[serde(default)]
    pub key_dates: Vec<KeyDate>,
    /// Money and rates found in the text.
    #[serde(default)]
    pub financial_terms: FinancialTerms,
    /// RFC3339 timestamp of the analysis.
    pub created_at: String,
}

/// A question asked about a document and the model's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaExchange {
    /// Unique identifier.
    pub id: String,
    /// Question as asked.
    pub question: String,
    /// Model answer.
    pub answer: String,
    /// RFC3339 timestamp.
    pub timestamp: String,
}

/// Persisted state for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Where the raw upload was written.
    pub file_path: String,
    /// Source format.
    pub file_kind: crate::extraction::FileKind,
    /// Upload size in bytes.
    pub file_size: u64,
    /// SHA-256 of the upload, hex encoded.
    pub file_hash: String,
    /// RFC3339 upload time.
    pub upload_timestamp: String,
    /// Extracted text.
    pub text: String,
    /// Size figures for `text`.
    pub metadata: DocumentMetadata,
    /// Analysis results.
    pub analysis: DocumentAnalysis,
    /// Questions asked so far, oldest first.
    #[serde(default)]
    pub qa_history: Vec<QaExchange>,
    /// Whether the chunks made it into the vector index.
    #[serde(default)]
    pub indexed: bool,
}

/// Library listing entry: a record without its text and analysis body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    /// Document identifier.
    pub id: String,
    /// Original filename.
    pub filename: String,
    /// Detected type.
    pub document_type: DocumentType,
    /// RFC3339 upload time.
    pub upload_timestamp: String,
    /// Upload size in bytes.
    pub file_size: u64,
    /// `file_size` for display.
    pub file_size_display: String,
    /// Relative upload time, e.g. `3 days ago`.
    pub uploaded: String,
    /// Risk score, 0 to 100.
    pub risk_score: u8,
    /// Display band of `risk_score`.
    pub risk_band: RiskBand,
    /// Hex colour of `risk_band`.
    pub risk_color: &'static str,
    /// Number of flagged clauses.
    pub risk_factor_count: usize,
    /// Whether the document is searchable.
    pub indexed: bool,
}

impl DocumentSummary {
    /// Summarize `record`, describing its age relative to `now`.
    pub fn at(record: &DocumentRecord, now: OffsetDateTime) -> Self {
        let risk_band = RiskBand::from_score(record.analysis.risk_score);
        Self {
            id: record.id.clone(),
            filename: record.filename.clone(),
            document_type: record.analysis.document_type,
            upload_timestamp: record.upload_timestamp.clone(),
            file_size: record.file_size,
            file_size_display: format_file_size(record.file_size),
            uploaded: format_age(&record.upload_timestamp, now),
            risk_score: record.analysis.risk_score,
            risk_band,
            risk_color: risk_band.color(),
            risk_factor_count: record.analysis.risk_factors.len(),
            indexed: record.indexed,
        }
    }
}

impl From<&DocumentRecord> for DocumentSummary {
    fn from(record: &DocumentRecord) -> Self {
        Self::at(record, OffsetDateTime::now_utc())
    }
}

/// Current time formatted as RFC3339.
pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}

/// Take at most `max_chars` characters from the start of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => &text[..offset],
        None => text,
    }
}
