//! Semantic-search documents and label matches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata attached to an indexed document chunk.
///
/// Known fields are typed; everything else the indexer attaches (entity
/// mentions and similar enrichment) lands in `extra` so the value
/// round-trips losslessly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(
        rename = "conceptType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub concept_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(rename = "chunkIndex", default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An indexed document chunk as returned by search and streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "contentUri", default, skip_serializing_if = "Option::is_none")]
    pub content_uri: Option<String>,
    #[serde(default)]
    pub meta: DocumentMetadata,
    /// Relevance score in `[0, 1]`; absent outside ranked results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// A ranked label match from the semantic label index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMatch {
    pub label: String,
    #[serde(rename = "entityUri")]
    pub entity_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DocumentMetadata>,
}

/// Combinator for metadata filter predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterMode {
    #[default]
    And,
    Or,
}

/// One span of text linked to an entity by the named-entity linker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedEntityMention {
    #[serde(rename = "startPosition")]
    pub start: u64,
    #[serde(rename = "endPosition")]
    pub end: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "entityUri")]
    pub entity_uri: String,
    #[serde(
        rename = "conceptType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub concept_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_metadata_fields_are_preserved() {
        let wire = serde_json::json!({
            "conceptType": "wacom:core#Person",
            "locale": "en_US",
            "chunkIndex": 3,
            "mention-0": "wacom:entity:abc",
            "sessionCount": 7,
        });
        let meta: DocumentMetadata = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(meta.concept_type.as_deref(), Some("wacom:core#Person"));
        assert_eq!(meta.chunk_index, Some(3));
        assert_eq!(meta.extra["mention-0"], "wacom:entity:abc");
        assert_eq!(meta.extra["sessionCount"], 7);
        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back, wire);
    }

    #[test]
    fn document_roundtrip() {
        let doc: VectorDocument = serde_json::from_value(serde_json::json!({
            "id": "d-1",
            "content": "Ada Lovelace wrote the first program.",
            "contentUri": "wacom:entity:ada",
            "score": 0.83,
            "meta": {"locale": "en_US"},
        }))
        .unwrap();
        assert_eq!(doc.score, Some(0.83));
        assert_eq!(doc.meta.locale.as_deref(), Some("en_US"));
    }

    #[test]
    fn filter_mode_tags() {
        assert_eq!(serde_json::to_value(FilterMode::And).unwrap(), "AND");
        assert_eq!(serde_json::to_value(FilterMode::Or).unwrap(), "OR");
    }
}
