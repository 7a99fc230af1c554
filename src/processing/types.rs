//! Core data types and error definitions for the document pipeline.

use crate::{
    document::{DocumentType, risk::RiskFilter},
    embedding::EmbeddingClientError,
    extraction::ExtractionError,
    llm::LlmError,
    metrics::MetricsSnapshot,
    qdrant::QdrantError,
    store::StoreError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while turning raw text into semantic chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Upload was rejected or could not be parsed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// File parsed but yielded no text.
    #[error("No text could be extracted from the document")]
    EmptyDocument,
    /// No document with this id.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Request parameters were unusable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// AI API key is not configured.
    #[error("AI service credentials are not configured (set GOOGLE_API_KEY)")]
    MissingCredentials,
    /// Generative AI call failed.
    #[error("AI service request failed: {0}")]
    Llm(#[from] LlmError),
    /// Embedding provider failed.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector database request failed.
    #[error("Vector store request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Embedding size disagrees with the collection.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension.
        expected: usize,
        /// Dimension returned by the provider.
        actual: usize,
    },
    /// Chunking failed.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Document store failed.
    #[error("Document store failed: {0}")]
    Store(#[from] StoreError),
    /// Raw upload could not be written.
    #[error("Failed to save upload to {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Analysis exceeded `DOCUMENT_PROCESSING_TIMEOUT`.
    #[error("Document processing timed out after {0} seconds")]
    Timeout(u64),
}

impl ProcessingError {
    /// Whether the failure is caused by missing or rejected credentials.
    pub fn is_credentials_error(&self) -> bool {
        match self {
            Self::Llm(error) => error.is_credentials_error(),
            other => matches!(
                other,
                Self::MissingCredentials
                    | Self::Embedding(EmbeddingClientError::MissingCredentials)
            ),
        }
    }
}

/// Library listing filters (`GET /documents`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryFilter {
    /// Only documents of this type.
    #[serde(default, rename = "type")]
    pub document_type: Option<DocumentType>,
    /// Only documents in this risk band.
    #[serde(default)]
    pub risk: Option<RiskFilter>,
    /// Case-insensitive filename substring.
    #[serde(default, rename = "q")]
    pub query: Option<String>,
}

/// Aggregate figures for the document library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryStats {
    /// Stored documents.
    pub total_documents: usize,
    /// Most frequent document type, if any documents exist.
    pub most_common_type: Option<DocumentType>,
    /// Documents scoring above the high-risk threshold.
    pub high_risk_documents: usize,
    /// Sum of upload sizes in bytes.
    pub total_size_bytes: u64,
    /// Human-readable `total_size_bytes`.
    pub total_size: String,
}

/// A chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkHit {
    /// Owning document.
    pub document_id: String,
    /// Original filename.
    pub filename: String,
    /// Document type recorded at indexing time.
    pub document_type: String,
    /// Chunk index within the document.
    pub chunk_id: u64,
    /// Chunk text.
    pub text: String,
    /// Cosine similarity.
    pub score: f32,
}

/// Downloadable text artefact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    /// Suggested download name.
    pub filename: String,
    /// File body.
    pub content: String,
}

/// Service counters returned by `GET /stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    /// Records in the document store.
    pub documents_stored: usize,
    /// Vector collection name.
    pub collection: String,
    /// Points in the collection, when the vector store answered.
    pub vector_count: Option<u64>,
    /// Process counters.
    pub metrics: MetricsSnapshot,
}

/// Reachability snapshot returned by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    /// `ok` when every dependency is usable, otherwise `degraded`.
    pub status: &'static str,
    /// Whether an AI API key is configured.
    pub ai_configured: bool,
    /// Whether Qdrant answered.
    pub vector_store_reachable: bool,
    /// Whether the document collection exists.
    pub collection_present: bool,
    /// Diagnostic captured when Qdrant is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
