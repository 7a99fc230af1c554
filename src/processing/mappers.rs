//! Mapping helpers between chunk embeddings, Qdrant points, and search hits.

use crate::{
    processing::types::{ChunkHit, ProcessingError},
    qdrant::{PointInsert, ScoredPoint},
};
use serde_json::{Map, Value};

/// Pair chunks with their vectors, rejecting vectors of the wrong size.
pub(crate) fn build_points(
    chunks: Vec<String>,
    vectors: Vec<Vec<f32>>,
    expected_dimension: usize,
) -> Result<Vec<PointInsert>, ProcessingError> {
    chunks
        .into_iter()
        .zip(vectors)
        .enumerate()
        .map(|(chunk_index, (text, vector))| {
            ensure_dimension(&vector, expected_dimension)?;
            Ok(PointInsert {
                chunk_index,
                text,
                vector,
            })
        })
        .collect()
}

pub(crate) fn ensure_dimension(vector: &[f32], expected: usize) -> Result<(), ProcessingError> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(ProcessingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        })
    }
}

/// Map a Qdrant scored point into a chunk hit; points without text are dropped.
pub(crate) fn map_scored_point(point: ScoredPoint) -> Option<ChunkHit> {
    let ScoredPoint { score, payload, .. } = point;
    let mut map = payload?;

    let text = take_string(&mut map, "text")?;
    if text.trim().is_empty() {
        return None;
    }

    Some(ChunkHit {
        document_id: take_string(&mut map, "document_id").unwrap_or_default(),
        filename: take_string(&mut map, "filename").unwrap_or_default(),
        document_type: take_string(&mut map, "document_type").unwrap_or_default(),
        chunk_id: map.get("chunk_id").and_then(Value::as_u64).unwrap_or(0),
        text,
        score,
    })
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_points_indexes_chunks_in_order() {
        let points = build_points(
            vec!["first".into(), "second".into()],
            vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            2,
        )
        .expect("points");
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].chunk_index, 1);
        assert_eq!(points[1].text, "second");
    }

    #[test]
    fn build_points_rejects_wrong_dimension() {
        let result = build_points(vec!["only".into()], vec![vec![0.5; 3]], 4);
        assert!(matches!(
            result,
            Err(ProcessingError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn map_scored_point_extracts_payload_fields() {
        let payload = json!({
            "document_id": "doc-1",
            "filename": "lease.pdf",
            "document_type": "rental",
            "chunk_id": 4,
            "text": "The deposit is non-refundable.",
        });
        let Value::Object(map) = payload else {
            panic!("object payload");
        };

        let hit = map_scored_point(ScoredPoint {
            id: "point-1".into(),
            score: 0.42,
            payload: Some(map),
        })
        .expect("hit");

        assert_eq!(hit.document_id, "doc-1");
        assert_eq!(hit.filename, "lease.pdf");
        assert_eq!(hit.document_type, "rental");
        assert_eq!(hit.chunk_id, 4);
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
    }

    #[test]
    fn points_without_text_are_dropped() {
        let point = ScoredPoint {
            id: "point-2".into(),
            score: 0.9,
            payload: None,
        };
        assert!(map_scored_point(point).is_none());
    }
}
