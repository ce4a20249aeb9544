//! The central entity type of the knowledge graph.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{Description, Label};
use super::iri::{OntologyClassReference, OntologyPropertyReference};
use super::locale::LocaleCode;
use super::property::{dedup_key, DataProperty, ObjectProperty, RelationTarget};
use crate::error::{ServiceError, ServiceResult};

/// Sync state of an entity relative to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityStatus {
    #[default]
    Unknown,
    Created,
    Updated,
    Synced,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            EntityStatus::Unknown => "UNKNOWN",
            EntityStatus::Created => "CREATED",
            EntityStatus::Updated => "UPDATED",
            EntityStatus::Synced => "SYNCED",
        };
        f.write_str(tag)
    }
}

/// Read/write/delete flags shared by tenant-wide and group rights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessRight {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
}

impl AccessRight {
    pub fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            delete: false,
        }
    }

    pub fn full() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
        }
    }
}

/// Downstream indexes an entity participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexTarget {
    Nel,
    VectorSearchWord,
    VectorSearchDocument,
    ElasticSearch,
}

impl IndexTarget {
    pub const ALL: [IndexTarget; 4] = [
        IndexTarget::Nel,
        IndexTarget::VectorSearchWord,
        IndexTarget::VectorSearchDocument,
        IndexTarget::ElasticSearch,
    ];

    /// Wire constant for this target.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexTarget::Nel => "NEL",
            IndexTarget::VectorSearchWord => "VectorSearchWord",
            IndexTarget::VectorSearchDocument => "VectorSearchDocument",
            IndexTarget::ElasticSearch => "ElasticSearch",
        }
    }

    pub fn parse(value: &str) -> ServiceResult<Self> {
        IndexTarget::ALL
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| {
                ServiceError::validation(format!("'{}' is not an indexing target", value))
            })
    }
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IndexTarget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IndexTarget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        IndexTarget::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Entity visibility used in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
    Shared,
    All,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Shared => "SHARED",
            Visibility::All => "ALL",
        }
    }
}

/// A node in the knowledge graph.
///
/// `uri` stays unset until the backend creates the entity; until then
/// the entity is client-local and may only appear as a relation
/// placeholder keyed by its source reference id.
#[derive(Debug, Clone, PartialEq)]
pub struct ThingObject {
    pub uri: Option<String>,
    pub concept_type: OntologyClassReference,
    pub labels: Vec<Label>,
    pub aliases: Vec<Label>,
    pub descriptions: Vec<Description>,
    pub image: Option<String>,
    pub data_properties: HashMap<OntologyPropertyReference, Vec<DataProperty>>,
    pub object_properties: HashMap<OntologyPropertyReference, ObjectProperty>,
    pub tenant_access: AccessRight,
    pub status: EntityStatus,
    pub use_for_nel: bool,
    pub use_vector_index: bool,
    pub use_vector_index_document: bool,
    pub use_full_text_index: bool,
    pub owner: bool,
    pub owner_id: Option<String>,
    pub group_ids: Vec<String>,
    pub visibility: Option<String>,
    /// Class IRIs assigned by external indexers; only present on
    /// entities that live outside the tenant's own ontology.
    pub ontology_types: Option<Vec<String>>,
}

impl ThingObject {
    pub fn new(concept_type: OntologyClassReference) -> Self {
        Self {
            uri: None,
            concept_type,
            labels: Vec::new(),
            aliases: Vec::new(),
            descriptions: Vec::new(),
            image: None,
            data_properties: HashMap::new(),
            object_properties: HashMap::new(),
            tenant_access: AccessRight::default(),
            status: EntityStatus::Unknown,
            use_for_nel: true,
            use_vector_index: false,
            use_vector_index_document: false,
            use_full_text_index: true,
            owner: true,
            owner_id: None,
            group_ids: Vec::new(),
            visibility: None,
            ontology_types: None,
        }
    }

    /// Main label for a locale, if one exists.
    pub fn label_for_locale(&self, locale: &LocaleCode) -> Option<&Label> {
        self.labels
            .iter()
            .find(|l| l.is_main && &l.locale == locale)
    }

    /// Description for a locale, if one exists.
    pub fn description_for_locale(&self, locale: &LocaleCode) -> Option<&Description> {
        self.descriptions.iter().find(|d| &d.locale == locale)
    }

    /// Add a main label, enforcing at most one per locale.
    pub fn add_label(&mut self, label: Label) -> ServiceResult<()> {
        if label.is_main && self.label_for_locale(&label.locale).is_some() {
            return Err(ServiceError::validation(format!(
                "entity already has a main label for locale {}",
                label.locale
            )));
        }
        if label.is_main {
            self.labels.push(label);
        } else {
            self.aliases.push(label);
        }
        Ok(())
    }

    /// Add an alias for a locale; duplicates are permitted.
    pub fn add_alias(&mut self, alias: Label) {
        self.aliases.push(Label {
            is_main: false,
            ..alias
        });
    }

    /// Add a data property, rejecting values outside their declared
    /// XSD range. The reserved source-tracking properties keep at most
    /// one entry per `(property, locale)`.
    pub fn add_data_property(&mut self, property: DataProperty) -> ServiceResult<()> {
        if !property.in_range() {
            return Err(ServiceError::validation(format!(
                "value '{}' is out of range for {}",
                property.value,
                property
                    .data_type
                    .map(|t| t.iri())
                    .unwrap_or_else(|| "untyped".to_string())
            )));
        }
        let slot = self
            .data_properties
            .entry(property.property.clone())
            .or_default();
        if property.property == OntologyPropertyReference::source_system()
            || property.property == OntologyPropertyReference::source_reference_id()
        {
            slot.retain(|existing| dedup_key(existing) != dedup_key(&property));
        }
        slot.push(property);
        Ok(())
    }

    /// Replace the outgoing targets of a relation.
    pub fn set_relation(
        &mut self,
        relation: OntologyPropertyReference,
        outgoing: Vec<RelationTarget>,
    ) {
        self.object_properties
            .entry(relation)
            .or_default()
            .outgoing = outgoing;
    }

    /// Append one outgoing target to a relation.
    pub fn add_relation(&mut self, relation: OntologyPropertyReference, target: RelationTarget) {
        self.object_properties
            .entry(relation)
            .or_default()
            .outgoing
            .push(target);
    }

    /// Values recorded for a data property, optionally per locale.
    pub fn data_property_values(
        &self,
        property: &OntologyPropertyReference,
        locale: Option<&LocaleCode>,
    ) -> Vec<&DataProperty> {
        self.data_properties
            .get(property)
            .map(|values| {
                values
                    .iter()
                    .filter(|value| match locale {
                        Some(locale) => value.locale.as_ref() == Some(locale),
                        None => true,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop every value of a data property.
    pub fn remove_data_property(&mut self, property: &OntologyPropertyReference) {
        self.data_properties.remove(property);
    }

    fn reserved_value(&self, property: &OntologyPropertyReference) -> Option<String> {
        self.data_properties
            .get(property)
            .and_then(|values| values.first())
            .map(|p| p.value.clone())
    }

    /// External source system recorded on the entity.
    pub fn source_system(&self) -> Option<String> {
        self.reserved_value(&OntologyPropertyReference::source_system())
    }

    /// External source reference id recorded on the entity.
    pub fn source_reference_id(&self) -> Option<String> {
        self.reserved_value(&OntologyPropertyReference::source_reference_id())
    }

    /// Record the external source system.
    pub fn set_source_system(&mut self, value: impl Into<String>) {
        let property = DataProperty::new(value, OntologyPropertyReference::source_system(), None);
        // In-range by construction (untyped).
        let _ = self.add_data_property(property);
    }

    /// Record the external source reference id.
    pub fn set_source_reference_id(&mut self, value: impl Into<String>) {
        let property = DataProperty::new(
            value,
            OntologyPropertyReference::source_reference_id(),
            None,
        );
        let _ = self.add_data_property(property);
    }

    /// Assign a random source reference id when none is present;
    /// returns the id in effect afterwards.
    pub fn ensure_source_reference_id(&mut self) -> String {
        if let Some(existing) = self.source_reference_id() {
            return existing;
        }
        let assigned = Uuid::new_v4().to_string();
        self.set_source_reference_id(assigned.clone());
        assigned
    }

    /// Indexing targets implied by the per-index flags.
    pub fn index_targets(&self) -> Vec<IndexTarget> {
        let mut targets = Vec::new();
        if self.use_for_nel {
            targets.push(IndexTarget::Nel);
        }
        if self.use_vector_index {
            targets.push(IndexTarget::VectorSearchWord);
        }
        if self.use_vector_index_document {
            targets.push(IndexTarget::VectorSearchDocument);
        }
        if self.use_full_text_index {
            targets.push(IndexTarget::ElasticSearch);
        }
        targets
    }

    /// Set the per-index flags from an explicit target list.
    pub fn set_index_targets(&mut self, targets: &[IndexTarget]) {
        self.use_for_nel = targets.contains(&IndexTarget::Nel);
        self.use_vector_index = targets.contains(&IndexTarget::VectorSearchWord);
        self.use_vector_index_document = targets.contains(&IndexTarget::VectorSearchDocument);
        self.use_full_text_index = targets.contains(&IndexTarget::ElasticSearch);
    }

    /// Status transition: backend assigned a URI on create.
    pub fn mark_created(&mut self, uri: impl Into<String>) {
        self.uri = Some(uri.into());
        self.status = EntityStatus::Created;
    }

    /// Status transition: mutated locally after a sync.
    pub fn mark_updated(&mut self) {
        self.status = EntityStatus::Updated;
    }

    /// Status transition: pushed successfully.
    pub fn mark_synced(&mut self) {
        self.status = EntityStatus::Synced;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::property::DataPropertyType;

    fn person() -> ThingObject {
        ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"))
    }

    #[test]
    fn one_main_label_per_locale() {
        let mut entity = person();
        entity
            .add_label(Label::main("Ada", LocaleCode::en_us()))
            .unwrap();
        assert!(entity
            .add_label(Label::main("Lady Lovelace", LocaleCode::en_us()))
            .is_err());
        entity
            .add_label(Label::main("エイダ", LocaleCode::ja_jp()))
            .unwrap();
        entity.add_alias(Label::alias("Countess", LocaleCode::en_us()));
        assert_eq!(entity.labels.len(), 2);
        assert_eq!(entity.aliases.len(), 1);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut entity = person();
        let bad = DataProperty::typed(
            "not-a-date",
            OntologyPropertyReference::new("wacom", "core", "birthDate"),
            None,
            DataPropertyType::Date,
        );
        assert!(entity.add_data_property(bad).is_err());
        assert!(entity.data_properties.is_empty());
    }

    #[test]
    fn source_reference_id_is_singular() {
        let mut entity = person();
        entity.set_source_reference_id("ref-1");
        entity.set_source_reference_id("ref-2");
        assert_eq!(entity.source_reference_id().as_deref(), Some("ref-2"));
        let slot = &entity.data_properties[&OntologyPropertyReference::source_reference_id()];
        assert_eq!(slot.len(), 1);
    }

    #[test]
    fn ensure_source_reference_id_is_idempotent() {
        let mut entity = person();
        let first = entity.ensure_source_reference_id();
        let second = entity.ensure_source_reference_id();
        assert_eq!(first, second);
    }

    #[test]
    fn status_transitions() {
        let mut entity = person();
        assert_eq!(entity.status, EntityStatus::Unknown);
        entity.mark_created("wacom:entity:abc");
        assert_eq!(entity.status, EntityStatus::Created);
        assert_eq!(entity.uri.as_deref(), Some("wacom:entity:abc"));
        entity.mark_updated();
        assert_eq!(entity.status, EntityStatus::Updated);
        entity.mark_synced();
        assert_eq!(entity.status, EntityStatus::Synced);
    }

    #[test]
    fn index_target_flags_roundtrip() {
        let mut entity = person();
        entity.set_index_targets(&[IndexTarget::Nel, IndexTarget::VectorSearchDocument]);
        assert!(entity.use_for_nel);
        assert!(!entity.use_vector_index);
        assert!(entity.use_vector_index_document);
        assert!(!entity.use_full_text_index);
        assert_eq!(
            entity.index_targets(),
            vec![IndexTarget::Nel, IndexTarget::VectorSearchDocument]
        );
    }

    #[test]
    fn relation_append_and_property_queries() {
        let mut entity = person();
        let relation = OntologyPropertyReference::new("wacom", "core", "links");
        entity.add_relation(relation.clone(), "wacom:entity:a".into());
        entity.add_relation(relation.clone(), "wacom:entity:b".into());
        assert_eq!(
            entity.object_properties[&relation].outgoing_ids(),
            vec!["wacom:entity:a", "wacom:entity:b"]
        );

        let property = OntologyPropertyReference::new("wacom", "core", "nickname");
        entity
            .add_data_property(DataProperty::new(
                "Ada",
                property.clone(),
                Some(LocaleCode::en_us()),
            ))
            .unwrap();
        entity
            .add_data_property(DataProperty::new(
                "エイダ",
                property.clone(),
                Some(LocaleCode::ja_jp()),
            ))
            .unwrap();
        assert_eq!(entity.data_property_values(&property, None).len(), 2);
        assert_eq!(
            entity
                .data_property_values(&property, Some(&LocaleCode::ja_jp()))
                .len(),
            1
        );
        entity.remove_data_property(&property);
        assert!(entity.data_property_values(&property, None).is_empty());
    }

    #[test]
    fn index_target_constants() {
        assert_eq!(IndexTarget::Nel.as_str(), "NEL");
        assert_eq!(IndexTarget::VectorSearchWord.as_str(), "VectorSearchWord");
        assert_eq!(
            IndexTarget::VectorSearchDocument.as_str(),
            "VectorSearchDocument"
        );
        assert_eq!(IndexTarget::ElasticSearch.as_str(), "ElasticSearch");
        assert!(IndexTarget::parse("NEL").is_ok());
        assert!(IndexTarget::parse("nel").is_err());
    }
}
