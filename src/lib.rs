#![deny(missing_docs)]

//! Core library for the Lega legal document analysis service.

/// AI prompts, response parsing, and the document analyzer.
pub mod analysis;
/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document records and local text heuristics.
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Upload validation and text extraction.
pub mod extraction;
/// Generative AI client.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis metrics helpers.
pub mod metrics;
/// Document processing pipeline and service.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// JSON-file document store.
pub mod store;
