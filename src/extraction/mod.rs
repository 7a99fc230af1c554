//! Upload validation and text extraction for PDF, DOCX, and plain-text files.
//!
//! Extraction is delegated to `pdf-extract` and `docx-rs`; both are CPU-bound and run on the
//! blocking pool so request handlers stay responsive. Extracted text is normalized line by line
//! (inner whitespace collapsed, blank lines dropped) before analysis.

mod docx;
mod pdf;
mod text;

pub use text::decode_text;

#[cfg(test)]
pub(crate) use pdf::testing::build_pdf;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while validating an upload or pulling text out of it.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Extension not in the accepted list.
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),
    /// Upload exceeds the configured size limit.
    #[error("File is too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Size of the rejected upload.
        size: u64,
        /// Configured maximum.
        limit: u64,
    },
    /// Upload carried no bytes.
    #[error("File is empty")]
    EmptyFile,
    /// PDF parser rejected the file.
    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),
    /// DOCX parser rejected the file.
    #[error("Failed to extract DOCX text: {0}")]
    Docx(String),
    /// Blocking extraction task did not complete.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Source format of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Word document (`.docx`; `.doc` is attempted with the same parser).
    Docx,
    /// Plain text.
    Txt,
}

impl FileKind {
    /// Map a file extension (without dot, any case) to a kind.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acceptance rules applied to incoming uploads.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Maximum size in bytes.
    pub max_bytes: u64,
    /// Accepted extensions, lowercase without dot.
    pub supported_types: Vec<String>,
}

/// Lowercased extension of `filename`, or an empty string when it has none.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Check type and size of an upload before any parsing happens.
pub fn validate_upload(
    filename: &str,
    size: u64,
    limits: &UploadLimits,
) -> Result<FileKind, ExtractionError> {
    let extension = file_extension(filename);
    let kind = FileKind::from_extension(&extension)
        .filter(|_| limits.supported_types.iter().any(|ty| *ty == extension))
        .ok_or_else(|| ExtractionError::UnsupportedType(display_extension(&extension)))?;

    if size == 0 {
        return Err(ExtractionError::EmptyFile);
    }
    if size > limits.max_bytes {
        return Err(ExtractionError::TooLarge {
            size,
            limit: limits.max_bytes,
        });
    }
    Ok(kind)
}

/// Extract normalized text from an upload of the given kind.
///
/// May return an empty string when the file parses but carries no text (e.g. scanned PDFs);
/// callers decide whether that is an error.
pub async fn extract_text(kind: FileKind, content: Vec<u8>) -> Result<String, ExtractionError> {
    let raw = match kind {
        FileKind::Txt => decode_text(&content),
        FileKind::Pdf => run_blocking(move || pdf::extract(&content)).await?,
        FileKind::Docx => run_blocking(move || docx::extract(&content)).await?,
    };
    let cleaned = clean_text(&raw);
    tracing::debug!(
        kind = %kind,
        characters = cleaned.chars().count(),
        "Extracted document text"
    );
    Ok(cleaned)
}

async fn run_blocking<F>(job: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|error| ExtractionError::Task(error.to_string()))?
}

/// Collapse runs of spaces and tabs inside each line and drop blank lines.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| {
            line.split([' ', '\t'])
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_extension(extension: &str) -> String {
    if extension.is_empty() {
        "(none)".into()
    } else {
        extension.to_string()
    }
}
