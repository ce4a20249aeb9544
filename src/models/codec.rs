//! Wire codec for entities.
//!
//! The platform speaks two JSON dialects for entities. The runtime
//! dialect keys `literals` as a map from property IRI to value lists;
//! the import dialect flattens literals into a list with a per-entry
//! `literal` key, surfaces the source identifiers at the top level and
//! replaces the per-index boolean flags with an explicit `targets`
//! array. Both dialects are accepted on input everywhere; bulk-import
//! submission always encodes the import dialect.

use serde_json::{json, Map, Value};

use super::content::{Description, Label};
use super::entity::{AccessRight, EntityStatus, IndexTarget, ThingObject};
use super::iri::{OntologyClassReference, OntologyPropertyReference};
use super::property::{DataProperty, ObjectProperty, RelationTarget};
use crate::error::{ServiceError, ServiceResult};

fn labels_to_wire(entity: &ThingObject) -> Value {
    let mut all: Vec<Value> = Vec::with_capacity(entity.labels.len() + entity.aliases.len());
    for label in entity.labels.iter().chain(entity.aliases.iter()) {
        all.push(json!({
            "value": label.content,
            "locale": label.locale.as_str(),
            "isMain": label.is_main,
        }));
    }
    Value::Array(all)
}

fn descriptions_to_wire(entity: &ThingObject) -> Value {
    Value::Array(
        entity
            .descriptions
            .iter()
            .map(|d| {
                json!({
                    "description": d.content,
                    "locale": d.locale.as_str(),
                })
            })
            .collect(),
    )
}

fn literal_entry_to_wire(property: &DataProperty, include_property: bool) -> Value {
    let mut entry = Map::new();
    entry.insert("value".to_string(), Value::String(property.value.clone()));
    if let Some(ref locale) = property.locale {
        entry.insert(
            "locale".to_string(),
            Value::String(locale.as_str().to_string()),
        );
    }
    if include_property {
        entry.insert(
            "literal".to_string(),
            Value::String(property.property.iri()),
        );
    }
    if let Some(data_type) = property.data_type {
        entry.insert("dataType".to_string(), Value::String(data_type.iri()));
    }
    Value::Object(entry)
}

fn relations_to_wire(entity: &ThingObject) -> Value {
    let mut map = Map::new();
    for (relation, slot) in &entity.object_properties {
        map.insert(
            relation.iri(),
            json!({
                "relation": relation.iri(),
                "in": slot.incoming_ids(),
                "out": slot.outgoing_ids(),
            }),
        );
    }
    Value::Object(map)
}

fn common_to_wire(entity: &ThingObject) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(ref uri) = entity.uri {
        map.insert("uri".to_string(), Value::String(uri.clone()));
    }
    map.insert(
        "type".to_string(),
        Value::String(entity.concept_type.iri()),
    );
    map.insert("status".to_string(), json!(entity.status.to_string()));
    map.insert("labels".to_string(), labels_to_wire(entity));
    map.insert("descriptions".to_string(), descriptions_to_wire(entity));
    if let Some(ref image) = entity.image {
        map.insert("image".to_string(), Value::String(image.clone()));
    }
    map.insert("relations".to_string(), relations_to_wire(entity));
    map.insert("groupIds".to_string(), json!(entity.group_ids));
    map.insert("owner".to_string(), Value::Bool(entity.owner));
    if let Some(ref owner_id) = entity.owner_id {
        map.insert("ownerId".to_string(), Value::String(owner_id.clone()));
    }
    if let Some(ref visibility) = entity.visibility {
        map.insert("visibility".to_string(), Value::String(visibility.clone()));
    }
    map.insert(
        "tenantRights".to_string(),
        json!({
            "read": entity.tenant_access.read,
            "write": entity.tenant_access.write,
            "delete": entity.tenant_access.delete,
        }),
    );
    if let Some(ref ontology_types) = entity.ontology_types {
        map.insert("ontologyTypes".to_string(), json!(ontology_types));
    }
    map
}

/// Encode an entity in the runtime dialect.
pub fn entity_to_runtime(entity: &ThingObject) -> Value {
    let mut map = common_to_wire(entity);
    let mut literals = Map::new();
    for (property, values) in &entity.data_properties {
        literals.insert(
            property.iri(),
            Value::Array(
                values
                    .iter()
                    .map(|v| literal_entry_to_wire(v, false))
                    .collect(),
            ),
        );
    }
    map.insert("literals".to_string(), Value::Object(literals));
    map.insert("use_for_nel".to_string(), Value::Bool(entity.use_for_nel));
    map.insert(
        "use_for_vector_index".to_string(),
        Value::Bool(entity.use_vector_index),
    );
    map.insert(
        "use_for_vector_document_index".to_string(),
        Value::Bool(entity.use_vector_index_document),
    );
    map.insert(
        "user_full_text".to_string(),
        Value::Bool(entity.use_full_text_index),
    );
    Value::Object(map)
}

/// Encode an entity in the import dialect.
pub fn entity_to_import(entity: &ThingObject) -> Value {
    let mut map = common_to_wire(entity);
    let mut literals = Vec::new();
    for values in entity.data_properties.values() {
        for value in values {
            literals.push(literal_entry_to_wire(value, true));
        }
    }
    map.insert("literals".to_string(), Value::Array(literals));
    map.insert(
        "targets".to_string(),
        json!(entity
            .index_targets()
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()),
    );
    if let Some(source_system) = entity.source_system() {
        map.insert("source_system".to_string(), Value::String(source_system));
    }
    if let Some(reference_id) = entity.source_reference_id() {
        map.insert(
            "source_reference_id".to_string(),
            Value::String(reference_id),
        );
    }
    Value::Object(map)
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn bool_field(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn parse_labels(value: &Value) -> ServiceResult<(Vec<Label>, Vec<Label>)> {
    let mut labels = Vec::new();
    let mut aliases = Vec::new();
    if let Some(entries) = value.get("labels").and_then(Value::as_array) {
        for entry in entries {
            let label: Label = serde_json::from_value(entry.clone()).map_err(|e| {
                ServiceError::parse(
                    format!("malformed label entry: {}", e),
                    Some(entry.to_string()),
                )
            })?;
            if label.is_main {
                labels.push(label);
            } else {
                aliases.push(label);
            }
        }
    }
    Ok((labels, aliases))
}

fn parse_descriptions(value: &Value) -> ServiceResult<Vec<Description>> {
    let mut descriptions = Vec::new();
    if let Some(entries) = value.get("descriptions").and_then(Value::as_array) {
        for entry in entries {
            let description: Description =
                serde_json::from_value(entry.clone()).map_err(|e| {
                    ServiceError::parse(
                        format!("malformed description entry: {}", e),
                        Some(entry.to_string()),
                    )
                })?;
            descriptions.push(description);
        }
    }
    Ok(descriptions)
}

fn parse_literal_entry(
    entry: &Value,
    property: Option<OntologyPropertyReference>,
) -> ServiceResult<DataProperty> {
    if !entry.is_object() {
        return Err(ServiceError::parse(
            "literal entry is not an object",
            Some(entry.to_string()),
        ));
    }
    let mut patched = entry.clone();
    if let Some(property) = property {
        // Runtime-dialect entries carry no `literal` key; the map key is
        // authoritative either way.
        patched["literal"] = Value::String(property.iri());
    }
    serde_json::from_value(patched).map_err(|e| {
        ServiceError::parse(
            format!("malformed literal entry: {}", e),
            Some(entry.to_string()),
        )
    })
}

fn parse_literals(entity: &mut ThingObject, value: &Value) -> ServiceResult<()> {
    match value.get("literals") {
        Some(Value::Object(by_property)) => {
            for (iri, entries) in by_property {
                let property = OntologyPropertyReference::parse(iri)?;
                let entries = entries.as_array().ok_or_else(|| {
                    ServiceError::parse(
                        format!("literal values for '{}' are not a list", iri),
                        None,
                    )
                })?;
                for entry in entries {
                    let parsed = parse_literal_entry(entry, Some(property.clone()))?;
                    entity
                        .data_properties
                        .entry(property.clone())
                        .or_default()
                        .push(parsed);
                }
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                let parsed = parse_literal_entry(entry, None)?;
                entity
                    .data_properties
                    .entry(parsed.property.clone())
                    .or_default()
                    .push(parsed);
            }
        }
        Some(other) => {
            return Err(ServiceError::parse(
                "entity 'literals' is neither a map nor a list",
                Some(other.to_string()),
            ));
        }
        None => {}
    }
    Ok(())
}

fn parse_relation_slot(entry: &Value) -> ServiceResult<(OntologyPropertyReference, ObjectProperty)> {
    let relation_iri = str_field(entry, "relation").ok_or_else(|| {
        ServiceError::parse("relation entry is missing 'relation'", Some(entry.to_string()))
    })?;
    let relation = OntologyPropertyReference::parse(relation_iri)?;
    let collect = |key: &str| -> Vec<RelationTarget> {
        entry
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(RelationTarget::from)
                    .collect()
            })
            .unwrap_or_default()
    };
    Ok((
        relation,
        ObjectProperty {
            incoming: collect("in"),
            outgoing: collect("out"),
        },
    ))
}

fn parse_relations(entity: &mut ThingObject, value: &Value) -> ServiceResult<()> {
    match value.get("relations") {
        Some(Value::Object(by_relation)) => {
            for entry in by_relation.values() {
                let (relation, slot) = parse_relation_slot(entry)?;
                entity.object_properties.insert(relation, slot);
            }
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                let (relation, slot) = parse_relation_slot(entry)?;
                entity.object_properties.insert(relation, slot);
            }
        }
        Some(Value::Null) | None => {}
        Some(other) => {
            return Err(ServiceError::parse(
                "entity 'relations' is neither a map nor a list",
                Some(other.to_string()),
            ));
        }
    }
    Ok(())
}

/// Decode an entity from either wire dialect.
pub fn entity_from_value(value: &Value) -> ServiceResult<ThingObject> {
    let type_iri = str_field(value, "type").ok_or_else(|| {
        ServiceError::parse("entity is missing 'type'", Some(value.to_string()))
    })?;
    let concept_type = OntologyClassReference::parse(type_iri)?;
    let mut entity = ThingObject::new(concept_type);

    entity.uri = str_field(value, "uri").map(str::to_string);
    entity.image = str_field(value, "image").map(str::to_string);
    let (labels, aliases) = parse_labels(value)?;
    entity.labels = labels;
    entity.aliases = aliases;
    entity.descriptions = parse_descriptions(value)?;
    parse_literals(&mut entity, value)?;
    parse_relations(&mut entity, value)?;

    entity.status = str_field(value, "status")
        .and_then(|s| serde_json::from_value::<EntityStatus>(Value::String(s.to_string())).ok())
        .unwrap_or(EntityStatus::Unknown);
    entity.owner = bool_field(value, "owner", true);
    entity.owner_id = str_field(value, "ownerId").map(str::to_string);
    entity.visibility = str_field(value, "visibility").map(str::to_string);
    entity.group_ids = value
        .get("groupIds")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if let Some(rights) = value.get("tenantRights") {
        entity.tenant_access = serde_json::from_value::<AccessRight>(rights.clone())
            .map_err(|e| ServiceError::parse(format!("malformed tenantRights: {}", e), None))?;
    }
    entity.ontology_types = value.get("ontologyTypes").and_then(Value::as_array).map(|v| {
        v.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    });

    if let Some(targets) = value.get("targets").and_then(Value::as_array) {
        // Import dialect: explicit target list wins over flag defaults.
        let mut parsed = Vec::new();
        for target in targets {
            let raw = target.as_str().ok_or_else(|| {
                ServiceError::parse("non-string indexing target", Some(target.to_string()))
            })?;
            parsed.push(IndexTarget::parse(raw)?);
        }
        entity.set_index_targets(&parsed);
    } else {
        entity.use_for_nel = bool_field(value, "use_for_nel", true);
        entity.use_vector_index = bool_field(value, "use_for_vector_index", false);
        entity.use_vector_index_document =
            bool_field(value, "use_for_vector_document_index", false);
        entity.use_full_text_index = bool_field(value, "user_full_text", true);
    }

    if let Some(source_system) = str_field(value, "source_system") {
        if entity.source_system().is_none() {
            entity.set_source_system(source_system);
        }
    }
    if let Some(reference_id) = str_field(value, "source_reference_id") {
        if entity.source_reference_id().is_none() {
            entity.set_source_reference_id(reference_id);
        }
    }

    Ok(entity)
}

/// Decode a wire list of entities, preserving input order.
pub fn entities_from_value(value: &Value) -> ServiceResult<Vec<ThingObject>> {
    let entries = value.as_array().ok_or_else(|| {
        ServiceError::parse("expected a JSON array of entities", Some(value.to_string()))
    })?;
    entries.iter().map(entity_from_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::locale::LocaleCode;
    use crate::models::property::DataPropertyType;

    fn sample_entity() -> ThingObject {
        let mut entity =
            ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
        entity.uri = Some("wacom:entity:1f0a".to_string());
        entity
            .add_label(Label::main("Ada Lovelace", LocaleCode::en_us()))
            .unwrap();
        entity.add_alias(Label::alias("Ada", LocaleCode::en_us()));
        entity
            .descriptions
            .push(Description::new("First programmer", LocaleCode::en_us()));
        entity
            .add_data_property(DataProperty::typed(
                "1815-12-10",
                OntologyPropertyReference::new("wacom", "core", "birthDate"),
                None,
                DataPropertyType::Date,
            ))
            .unwrap();
        entity.set_source_system("unit-test");
        entity.set_source_reference_id("ada-001");
        entity.set_relation(
            OntologyPropertyReference::new("wacom", "core", "links"),
            vec![RelationTarget::from("wacom:entity:anchor")],
        );
        entity.group_ids = vec!["g-1".to_string()];
        entity.visibility = Some("PRIVATE".to_string());
        entity
    }

    #[test]
    fn runtime_dialect_roundtrip() {
        let entity = sample_entity();
        let wire = entity_to_runtime(&entity);
        assert!(wire["literals"].is_object());
        assert_eq!(wire["type"], "wacom:core#Person");
        assert_eq!(wire["use_for_nel"], true);
        let back = entity_from_value(&wire).unwrap();
        assert_eq!(back.uri, entity.uri);
        assert_eq!(back.labels, entity.labels);
        assert_eq!(back.aliases, entity.aliases);
        assert_eq!(back.descriptions, entity.descriptions);
        assert_eq!(back.data_properties, entity.data_properties);
        assert_eq!(back.object_properties, entity.object_properties);
        assert_eq!(back.group_ids, entity.group_ids);
        assert_eq!(back.visibility, entity.visibility);
        assert_eq!(back.index_targets(), entity.index_targets());
    }

    #[test]
    fn import_dialect_roundtrip() {
        let entity = sample_entity();
        let wire = entity_to_import(&entity);
        assert!(wire["literals"].is_array());
        assert_eq!(wire["source_reference_id"], "ada-001");
        assert_eq!(wire["source_system"], "unit-test");
        assert!(wire["targets"]
            .as_array()
            .unwrap()
            .iter()
            .any(|t| t == "NEL"));
        let back = entity_from_value(&wire).unwrap();
        assert_eq!(back.source_reference_id().as_deref(), Some("ada-001"));
        assert_eq!(back.data_properties, entity.data_properties);
        assert_eq!(back.index_targets(), entity.index_targets());
    }

    #[test]
    fn relations_collapse_to_uris() {
        let mut entity = sample_entity();
        let mut placeholder =
            ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
        placeholder.set_source_reference_id("pending-42");
        entity.set_relation(
            OntologyPropertyReference::new("wacom", "core", "knows"),
            vec![RelationTarget::Entity(Box::new(placeholder))],
        );
        let wire = entity_to_runtime(&entity);
        let out = wire["relations"]["wacom:core#knows"]["out"].as_array().unwrap();
        assert_eq!(out[0], "pending-42");
    }

    #[test]
    fn missing_type_is_a_parse_error() {
        let err = entity_from_value(&json!({"uri": "wacom:entity:x"})).unwrap_err();
        assert!(matches!(err, ServiceError::Parse { .. }));
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let wire = json!({
            "type": "wacom:core#Person",
            "literals": [{"value": "x", "literal": "wacom:core#p", "dataType": "xsd:mystery"}],
        });
        assert!(entity_from_value(&wire).is_err());
    }

    #[test]
    fn relation_list_form_is_accepted() {
        let wire = json!({
            "type": "wacom:core#Person",
            "relations": [
                {"relation": "wacom:core#links", "in": [], "out": ["wacom:entity:a"]}
            ],
        });
        let entity = entity_from_value(&wire).unwrap();
        let slot = &entity.object_properties
            [&OntologyPropertyReference::new("wacom", "core", "links")];
        assert_eq!(slot.outgoing_ids(), vec!["wacom:entity:a".to_string()]);
    }
}
