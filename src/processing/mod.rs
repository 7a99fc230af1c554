//! Document processing: upload analysis, chunk indexing, retrieval, and Q&A orchestration.

pub mod chunking;
mod mappers;
pub mod pipeline;
mod service;
pub mod types;

pub use pipeline::{NewRecord, build_analysis, read_upload};
pub use service::{DocumentApi, DocumentService, ServiceSettings};
pub use types::{
    ChunkHit, ChunkingError, ExportedFile, HealthSnapshot, LibraryFilter, LibraryStats,
    ProcessingError, ServiceStats,
};
