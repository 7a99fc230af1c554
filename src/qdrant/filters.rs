//! Filter helpers for Qdrant queries scoped by document.

use serde_json::{Value, json};

use super::payload::{DOCUMENT_ID_FIELD, DOCUMENT_TYPE_FIELD};
use super::types::SearchFilterArgs;

/// Compose a Qdrant filter from optional document constraints.
pub fn build_search_filter(args: &SearchFilterArgs) -> Option<Value> {
    let mut must: Vec<Value> = Vec::new();
    let mut must_not: Vec<Value> = Vec::new();

    if let Some(document_id) = args.document_id.as_deref().and_then(non_empty) {
        must.push(match_value(DOCUMENT_ID_FIELD, document_id));
    }
    if let Some(document_type) = args.document_type.as_deref().and_then(non_empty) {
        must.push(match_value(DOCUMENT_TYPE_FIELD, document_type));
    }
    if let Some(excluded) = args.exclude_document_id.as_deref().and_then(non_empty) {
        must_not.push(match_value(DOCUMENT_ID_FIELD, excluded));
    }

    let mut filter = serde_json::Map::new();
    if !must.is_empty() {
        filter.insert("must".into(), Value::Array(must));
    }
    if !must_not.is_empty() {
        filter.insert("must_not".into(), Value::Array(must_not));
    }
    (!filter.is_empty()).then_some(Value::Object(filter))
}

/// Filter matching every chunk of one document.
pub fn document_filter(document_id: &str) -> Value {
    json!({ "must": [ match_value(DOCUMENT_ID_FIELD, document_id) ] })
}

fn match_value(key: &str, value: &str) -> Value {
    json!({
        "key": key,
        "match": { "value": value }
    })
}

fn non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_to_a_single_document() {
        let filter = build_search_filter(&SearchFilterArgs {
            document_id: Some("doc-1".into()),
            ..Default::default()
        })
        .expect("filter");

        assert_eq!(filter, document_filter("doc-1"));
        assert_eq!(
            filter,
            json!({
                "must": [
                    { "key": "document_id", "match": { "value": "doc-1" } }
                ]
            })
        );
    }

    #[test]
    fn excludes_a_document_and_restricts_type() {
        let filter = build_search_filter(&SearchFilterArgs {
            exclude_document_id: Some("doc-1".into()),
            document_type: Some("loan".into()),
            ..Default::default()
        })
        .expect("filter");

        assert_eq!(
            filter,
            json!({
                "must": [
                    { "key": "document_type", "match": { "value": "loan" } }
                ],
                "must_not": [
                    { "key": "document_id", "match": { "value": "doc-1" } }
                ]
            })
        );
    }

    #[test]
    fn returns_none_when_empty_or_blank() {
        assert!(build_search_filter(&SearchFilterArgs::default()).is_none());
        assert!(
            build_search_filter(&SearchFilterArgs {
                document_id: Some("   ".into()),
                ..Default::default()
            })
            .is_none()
        );
    }
}
