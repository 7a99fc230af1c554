//! Helpers for constructing Qdrant point identifiers and payloads.

use crate::qdrant::types::ChunkSource;
use serde_json::{Value, json};
use uuid::Uuid;

/// Payload field holding the owning document id.
pub const DOCUMENT_ID_FIELD: &str = "document_id";
/// Payload field holding the document type.
pub const DOCUMENT_TYPE_FIELD: &str = "document_type";

const CHUNK_TYPE: &str = "text";

/// Deterministic point id for chunk `index` of `document_id`.
///
/// Re-indexing a document overwrites its previous points instead of duplicating them.
pub fn chunk_point_id(document_id: &str, index: usize) -> String {
    let key = format!("{document_id}_chunk_{index}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(source: &ChunkSource, chunk_index: usize, text: &str) -> Value {
    json!({
        DOCUMENT_ID_FIELD: source.document_id,
        "chunk_id": chunk_index,
        "chunk_type": CHUNK_TYPE,
        "filename": source.filename,
        DOCUMENT_TYPE_FIELD: source.document_type,
        "upload_date": source.upload_date,
        "text": text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> ChunkSource {
        ChunkSource {
            document_id: "doc-1".into(),
            filename: "lease.pdf".into(),
            document_type: "rental".into(),
            upload_date: "2025-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn point_ids_are_stable_per_document_and_index() {
        assert_eq!(chunk_point_id("doc-1", 0), chunk_point_id("doc-1", 0));
        assert_ne!(chunk_point_id("doc-1", 0), chunk_point_id("doc-1", 1));
        assert_ne!(chunk_point_id("doc-1", 0), chunk_point_id("doc-2", 0));
        assert!(Uuid::parse_str(&chunk_point_id("doc-1", 3)).is_ok());
    }

    #[test]
    fn payload_carries_document_fields() {
        let payload = build_payload(&source(), 2, "Rent is due monthly.");
        assert_eq!(payload["document_id"], "doc-1");
        assert_eq!(payload["chunk_id"], 2);
        assert_eq!(payload["chunk_type"], "text");
        assert_eq!(payload["filename"], "lease.pdf");
        assert_eq!(payload["document_type"], "rental");
        assert_eq!(payload["upload_date"], "2025-01-01T00:00:00Z");
        assert_eq!(payload["text"], "Rent is due monthly.");
    }
}
