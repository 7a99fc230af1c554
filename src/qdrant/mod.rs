//! Qdrant vector store integration.

pub mod client;
pub mod filters;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use filters::{build_search_filter, document_filter};
pub use payload::chunk_point_id;
pub use types::{ChunkSource, PointInsert, QdrantError, ScoredPoint, SearchFilterArgs};
