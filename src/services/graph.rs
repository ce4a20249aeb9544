//! Knowledge-graph service: entity CRUD, search, listing, NEL,
//! activation and index-target management.
//!
//! Request construction and response parsing are pure helpers shared by
//! the async and blocking clients, so both flavors run identical state
//! machines over different transport primitives.

use std::collections::HashMap;

use serde_json::{json, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::codec::{entities_from_value, entity_from_value, entity_to_runtime};
use crate::models::{
    DataProperty, IndexTarget, Label, LinkedEntityMention, LocaleCode, ObjectProperty,
    OntologyClassReference, OntologyPropertyReference, ThingObject, Visibility,
};
use crate::transport::{CallOptions, RequestSpec};

/// Match mode for literal search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPattern {
    Regex,
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl SearchPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchPattern::Regex => "regex",
            SearchPattern::Eq => "eq",
            SearchPattern::Gt => "gt",
            SearchPattern::Gte => "gte",
            SearchPattern::Lt => "lt",
            SearchPattern::Lte => "lte",
        }
    }
}

/// Filter for paginated entity listing.
#[derive(Debug, Clone)]
pub struct ListingFilter {
    /// Entities of this class and its subclasses.
    pub concept_type: OntologyClassReference,
    pub page_id: Option<String>,
    pub limit: Option<u32>,
    pub locale: Option<LocaleCode>,
    pub is_owner: Option<bool>,
    pub visibility: Option<Visibility>,
}

impl ListingFilter {
    pub fn for_type(concept_type: OntologyClassReference) -> Self {
        Self {
            concept_type,
            page_id: None,
            limit: None,
            locale: None,
            is_owner: None,
            visibility: None,
        }
    }
}

/// One page of a listing response.
#[derive(Debug, Clone)]
pub struct EntityPage {
    pub entities: Vec<ThingObject>,
    pub total: u64,
    pub next_page_id: Option<String>,
}

/// One page of a search response.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub entities: Vec<ThingObject>,
    pub next_page_token: Option<String>,
}

/// One edge of an activated subgraph.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationTriple {
    pub subject: String,
    pub predicate: OntologyPropertyReference,
    pub object: String,
}

/// Activated subgraph induced by seed URIs up to a depth.
#[derive(Debug, Clone)]
pub struct Activation {
    pub entities: Vec<ThingObject>,
    pub triples: Vec<RelationTriple>,
}

/// Request builders and response parsers shared by both flavors.
pub(crate) mod wire {
    use super::*;

    pub fn create_entity(base: &Url, entity: &ThingObject) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity"])?;
        Ok(RequestSpec::post(url).json(entity_to_runtime(entity)))
    }

    pub fn parse_uri(value: &Value) -> ServiceResult<String> {
        value
            .get("uri")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::parse("create response carries no 'uri'", Some(value.to_string()))
            })
    }

    pub fn create_entities(base: &Url, entities: &[ThingObject]) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity"])?;
        let body: Vec<Value> = entities.iter().map(entity_to_runtime).collect();
        Ok(RequestSpec::post(url).json(Value::Array(body)))
    }

    pub fn update_entity(base: &Url, entity: &ThingObject) -> ServiceResult<RequestSpec> {
        let uri = entity.uri.as_deref().ok_or_else(|| {
            ServiceError::validation("entity has no URI; create it before updating")
        })?;
        let url = crate::transport::join_url(base, &["entity", uri])?;
        Ok(RequestSpec::patch(url).json(entity_to_runtime(entity)))
    }

    pub fn delete_entity(base: &Url, uri: &str, force: bool) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri])?;
        Ok(RequestSpec::delete(url).param("force", force.to_string()))
    }

    pub fn delete_entities(base: &Url, uris: &[&str], force: bool) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity"])?;
        let mut spec = RequestSpec::delete(url).param("force", force.to_string());
        for uri in uris {
            spec = spec.param("uri", *uri);
        }
        Ok(spec)
    }

    pub fn get_entity(base: &Url, uri: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri])?;
        Ok(RequestSpec::get(url))
    }

    pub fn get_entities(base: &Url, uris: &[&str]) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity"])?;
        let mut spec = RequestSpec::get(url);
        for uri in uris {
            spec = spec.param("uri", *uri);
        }
        Ok(spec)
    }

    pub fn parse_entity(value: &Value) -> ServiceResult<ThingObject> {
        let mut entity = entity_from_value(value)?;
        entity.mark_synced();
        Ok(entity)
    }

    /// Entity list under `result` or `entities`, or a bare array.
    pub fn parse_entity_list(value: &Value) -> ServiceResult<Vec<ThingObject>> {
        let list = value
            .get("result")
            .or_else(|| value.get("entities"))
            .unwrap_or(value);
        entities_from_value(list)
    }

    pub fn relations(base: &Url, uri: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "relations"])?;
        Ok(RequestSpec::get(url))
    }

    pub fn parse_relations(
        value: &Value,
    ) -> ServiceResult<HashMap<OntologyPropertyReference, ObjectProperty>> {
        let map = value
            .get("relations")
            .unwrap_or(value)
            .as_object()
            .ok_or_else(|| {
                ServiceError::parse("relations response is not a map", Some(value.to_string()))
            })?;
        let mut relations = HashMap::new();
        for entry in map.values() {
            let relation_iri = entry
                .get("relation")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ServiceError::parse("relation entry missing 'relation'", Some(entry.to_string()))
                })?;
            let relation = OntologyPropertyReference::parse(relation_iri)?;
            let collect = |key: &str| -> Vec<crate::models::RelationTarget> {
                entry
                    .get(key)
                    .and_then(Value::as_array)
                    .map(|targets| {
                        targets
                            .iter()
                            .filter_map(Value::as_str)
                            .map(Into::into)
                            .collect()
                    })
                    .unwrap_or_default()
            };
            relations.insert(
                relation,
                ObjectProperty {
                    incoming: collect("in"),
                    outgoing: collect("out"),
                },
            );
        }
        Ok(relations)
    }

    pub fn labels(base: &Url, uri: &str, locale: Option<&LocaleCode>) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "labels"])?;
        Ok(RequestSpec::get(url).opt_param("locale", locale.map(|l| l.as_str().to_string())))
    }

    pub fn parse_labels(value: &Value) -> ServiceResult<Vec<Label>> {
        let list = value.get("labels").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed labels response: {}", e), None))
    }

    pub fn literals(
        base: &Url,
        uri: &str,
        locale: Option<&LocaleCode>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "literals"])?;
        Ok(RequestSpec::get(url).opt_param("locale", locale.map(|l| l.as_str().to_string())))
    }

    pub fn parse_literals(value: &Value) -> ServiceResult<Vec<DataProperty>> {
        let list = value.get("literals").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed literals response: {}", e), None))
    }

    pub fn set_image_bytes(
        base: &Url,
        uri: &str,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "image"])?;
        Ok(RequestSpec::post(url).multipart("file", file_name, mime_type, data))
    }

    pub fn set_image_url(
        base: &Url,
        uri: &str,
        image_url: &str,
        mime_type: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "image", "url"])?;
        let mut body = json!({ "url": image_url });
        if let Some(mime_type) = mime_type {
            body["mimeType"] = Value::String(mime_type.to_string());
        }
        Ok(RequestSpec::post(url).json(body))
    }

    pub fn parse_image_id(value: &Value) -> ServiceResult<String> {
        value
            .get("imageId")
            .or_else(|| value.get("image"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::parse("image response carries no id", Some(value.to_string()))
            })
    }

    pub fn listing(base: &Url, filter: &ListingFilter) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity"])?;
        Ok(RequestSpec::get(url)
            .param("type", filter.concept_type.iri())
            .opt_param("nextPageId", filter.page_id.clone())
            .opt_param("limit", filter.limit.map(|l| l.to_string()))
            .opt_param("locale", filter.locale.as_ref().map(|l| l.as_str().to_string()))
            .opt_param("isOwner", filter.is_owner.map(|o| o.to_string()))
            .opt_param(
                "visibility",
                filter.visibility.map(|v| v.as_str().to_string()),
            ))
    }

    pub fn parse_listing(value: &Value) -> ServiceResult<EntityPage> {
        let entities = parse_entity_list(value)?;
        let total = value
            .get("total")
            .and_then(Value::as_u64)
            .unwrap_or(entities.len() as u64);
        let next_page_id = value
            .get("nextPageId")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(EntityPage {
            entities,
            total,
            next_page_id,
        })
    }

    pub fn search_labels(
        base: &Url,
        term: &str,
        locale: &LocaleCode,
        exact_match: bool,
        page_token: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["search", "labels"])?;
        Ok(RequestSpec::get(url)
            .param("value", term)
            .param("locale", locale.as_str())
            .param("exactMatch", exact_match.to_string())
            .opt_param("nextPageToken", page_token.map(str::to_string)))
    }

    pub fn search_description(
        base: &Url,
        term: &str,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["search", "description"])?;
        Ok(RequestSpec::get(url)
            .param("value", term)
            .param("locale", locale.as_str())
            .opt_param("nextPageToken", page_token.map(str::to_string)))
    }

    pub fn search_literals(
        base: &Url,
        term: &str,
        property: &OntologyPropertyReference,
        pattern: SearchPattern,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["search", "literals"])?;
        Ok(RequestSpec::get(url)
            .param("value", term)
            .param("literal", property.iri())
            .param("pattern", pattern.as_str())
            .param("locale", locale.as_str())
            .opt_param("nextPageToken", page_token.map(str::to_string)))
    }

    /// Exactly one of subject/object must be supplied; checked before
    /// any HTTP call.
    pub fn search_relation(
        base: &Url,
        subject_uri: Option<&str>,
        relation: &OntologyPropertyReference,
        object_uri: Option<&str>,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        if subject_uri.is_some() == object_uri.is_some() {
            return Err(ServiceError::validation(
                "Only one parameter is allowed: either subject_uri or object_uri",
            ));
        }
        let url = crate::transport::join_url(base, &["search", "relation"])?;
        Ok(RequestSpec::get(url)
            .opt_param("subject", subject_uri.map(str::to_string))
            .opt_param("object", object_uri.map(str::to_string))
            .param("relation", relation.iri())
            .param("locale", locale.as_str())
            .opt_param("nextPageToken", page_token.map(str::to_string)))
    }

    pub fn parse_search_page(value: &Value) -> ServiceResult<SearchPage> {
        let entities = parse_entity_list(value)?;
        let next_page_token = value
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(SearchPage {
            entities,
            next_page_token,
        })
    }

    pub fn activations(base: &Url, uris: &[&str], depth: u32) -> ServiceResult<RequestSpec> {
        if uris.is_empty() {
            return Err(ServiceError::validation(
                "activation requires at least one seed URI",
            ));
        }
        let url = crate::transport::join_url(base, &["entity", "activations"])?;
        let mut spec = RequestSpec::get(url).param("activation", depth.to_string());
        for uri in uris {
            spec = spec.param("uri", *uri);
        }
        Ok(spec)
    }

    pub fn parse_activation(value: &Value) -> ServiceResult<Activation> {
        let entities = parse_entity_list(value.get("entities").unwrap_or(&Value::Null))?;
        let mut triples = Vec::new();
        if let Some(entries) = value.get("triples").and_then(Value::as_array) {
            for entry in entries {
                let subject = entry.get("subject").and_then(Value::as_str);
                let predicate = entry.get("predicate").and_then(Value::as_str);
                let object = entry.get("object").and_then(Value::as_str);
                let (Some(subject), Some(predicate), Some(object)) =
                    (subject, predicate, object)
                else {
                    return Err(ServiceError::parse(
                        "malformed activation triple",
                        Some(entry.to_string()),
                    ));
                };
                triples.push(RelationTriple {
                    subject: subject.to_string(),
                    predicate: OntologyPropertyReference::parse(predicate)?,
                    object: object.to_string(),
                });
            }
        }
        Ok(Activation { entities, triples })
    }

    pub fn link_entities(
        base: &Url,
        text: &str,
        locale: &LocaleCode,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["nel", "text"])?;
        Ok(RequestSpec::post(url).json(json!({
            "locale": locale.as_str(),
            "text": text,
        })))
    }

    pub fn parse_mentions(value: &Value) -> ServiceResult<Vec<LinkedEntityMention>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed NEL response: {}", e), None))
    }

    pub fn ontology_update(base: &Url) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["ontology", "update"])?;
        Ok(RequestSpec::post(url))
    }

    pub fn add_index_targets(
        base: &Url,
        uri: &str,
        targets: &[IndexTarget],
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "index"])?;
        Ok(RequestSpec::post(url).json(json!({
            "targets": targets.iter().map(|t| t.as_str()).collect::<Vec<_>>(),
        })))
    }

    pub fn remove_index_targets(
        base: &Url,
        uri: &str,
        targets: &[IndexTarget],
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", uri, "index"])?;
        let mut spec = RequestSpec::delete(url);
        for target in targets {
            spec = spec.param("target", target.as_str());
        }
        Ok(spec)
    }

    /// Per-target outcome map: `UPSERT`, `DELETE`, `Target already
    /// exists` or `Not found`.
    pub fn parse_index_outcomes(value: &Value) -> ServiceResult<HashMap<String, String>> {
        let map = value.as_object().ok_or_else(|| {
            ServiceError::parse("index response is not a map", Some(value.to_string()))
        })?;
        Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
            .collect())
    }

    pub fn parse_job_id(value: &Value) -> ServiceResult<String> {
        value
            .get("jobId")
            .or_else(|| value.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::parse("import response carries no job id", Some(value.to_string()))
            })
    }

    /// Bulk-import submission always encodes the import dialect.
    pub fn import_entities(base: &Url, entities: &[ThingObject]) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", "bulk"])?;
        let body: Vec<Value> = entities
            .iter()
            .map(crate::models::codec::entity_to_import)
            .collect();
        Ok(RequestSpec::post(url).json(Value::Array(body)))
    }

    pub fn job_status(base: &Url, job_id: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["entity", "bulk", job_id, "status"],
        )?))
    }

    pub fn import_new_uris(
        base: &Url,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", "bulk", job_id, "uris"])?;
        Ok(RequestSpec::get(url).opt_param("pageId", page_id.map(str::to_string)))
    }

    pub fn import_error_log(
        base: &Url,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["entity", "bulk", job_id, "errors"])?;
        Ok(RequestSpec::get(url).opt_param("pageId", page_id.map(str::to_string)))
    }

    pub fn parse_job(value: &Value) -> ServiceResult<crate::models::ImportJob> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed job status: {}", e), None))
    }

    pub fn parse_uris_page(value: &Value) -> ServiceResult<crate::models::NewUrisPage> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed URI page: {}", e), None))
    }

    pub fn parse_error_page(value: &Value) -> ServiceResult<crate::models::ErrorLogPage> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed error-log page: {}", e), None))
    }
}

/// Core entity surface as a trait, so callers can swap in a test
/// double for the graph service.
#[async_trait::async_trait]
pub trait KnowledgeGraph: Send + Sync {
    async fn create_entity(&self, entity: &ThingObject) -> ServiceResult<String>;

    async fn update_entity(&self, entity: &ThingObject) -> ServiceResult<()>;

    async fn delete_entity(&self, uri: &str, force: bool) -> ServiceResult<()>;

    async fn entity(&self, uri: &str) -> ServiceResult<ThingObject>;

    /// One page of the entity listing.
    async fn listing(&self, filter: &ListingFilter) -> ServiceResult<EntityPage>;

    /// Submit entities for asynchronous bulk import; returns the job id.
    async fn import_entities(&self, entities: &[ThingObject]) -> ServiceResult<String>;

    async fn job_status(&self, job_id: &str) -> ServiceResult<crate::models::ImportJob>;

    async fn import_new_uris(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::NewUrisPage>;

    async fn import_error_log(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::ErrorLogPage>;
}

/// Async knowledge-graph client.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) base: ClientBase,
}

#[async_trait::async_trait]
impl KnowledgeGraph for GraphClient {
    async fn create_entity(&self, entity: &ThingObject) -> ServiceResult<String> {
        GraphClient::create_entity(self, entity).await
    }

    async fn update_entity(&self, entity: &ThingObject) -> ServiceResult<()> {
        GraphClient::update_entity(self, entity).await
    }

    async fn delete_entity(&self, uri: &str, force: bool) -> ServiceResult<()> {
        GraphClient::delete_entity(self, uri, force).await
    }

    async fn entity(&self, uri: &str) -> ServiceResult<ThingObject> {
        GraphClient::entity(self, uri).await
    }

    async fn listing(&self, filter: &ListingFilter) -> ServiceResult<EntityPage> {
        GraphClient::listing(self, filter).await
    }

    async fn import_entities(&self, entities: &[ThingObject]) -> ServiceResult<String> {
        GraphClient::import_entities(self, entities).await
    }

    async fn job_status(&self, job_id: &str) -> ServiceResult<crate::models::ImportJob> {
        GraphClient::job_status(self, job_id).await
    }

    async fn import_new_uris(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::NewUrisPage> {
        GraphClient::import_new_uris(self, job_id, page_id).await
    }

    async fn import_error_log(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::ErrorLogPage> {
        GraphClient::import_error_log(self, job_id, page_id).await
    }
}

impl GraphClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: ClientBase::new(config)?,
        })
    }

    pub fn core(&self) -> &ClientBase {
        &self.base
    }

    pub fn core_mut(&mut self) -> &mut ClientBase {
        &mut self.base
    }

    async fn json(&self, spec: RequestSpec) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(spec, self.base.auth()?, CallOptions::default())
            .await
    }

    async fn empty(&self, spec: RequestSpec) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(spec, self.base.auth()?, CallOptions::default())
            .await
    }

    /// Create an entity; returns the assigned URI.
    ///
    /// A duplicate `(sourceSystem, sourceReferenceId)` within the
    /// tenant may yield the pre-existing URI, which counts as success.
    pub async fn create_entity(&self, entity: &ThingObject) -> ServiceResult<String> {
        let value = self.json(wire::create_entity(&self.base.base, entity)?).await?;
        wire::parse_uri(&value)
    }

    /// Create a batch; the response preserves input order.
    pub async fn create_entities(
        &self,
        entities: &[ThingObject],
    ) -> ServiceResult<Vec<ThingObject>> {
        let value = self
            .json(wire::create_entities(&self.base.base, entities)?)
            .await?;
        wire::parse_entity_list(&value)
    }

    /// Full replacement of the entity's server state.
    pub async fn update_entity(&self, entity: &ThingObject) -> ServiceResult<()> {
        self.empty(wire::update_entity(&self.base.base, entity)?).await
    }

    /// Delete one entity; `force` also removes dependent relations.
    pub async fn delete_entity(&self, uri: &str, force: bool) -> ServiceResult<()> {
        self.empty(wire::delete_entity(&self.base.base, uri, force)?)
            .await
    }

    /// Delete several entities in one call.
    pub async fn delete_entities(&self, uris: &[&str], force: bool) -> ServiceResult<()> {
        self.empty(wire::delete_entities(&self.base.base, uris, force)?)
            .await
    }

    /// Fetch an entity by URI.
    pub async fn entity(&self, uri: &str) -> ServiceResult<ThingObject> {
        let value = self.json(wire::get_entity(&self.base.base, uri)?).await?;
        wire::parse_entity(&value)
    }

    /// Fetch several entities by URI.
    pub async fn entities_by_uris(&self, uris: &[&str]) -> ServiceResult<Vec<ThingObject>> {
        let value = self.json(wire::get_entities(&self.base.base, uris)?).await?;
        wire::parse_entity_list(&value)
    }

    /// Object properties of an entity, keyed by property reference.
    pub async fn relations(
        &self,
        uri: &str,
    ) -> ServiceResult<HashMap<OntologyPropertyReference, ObjectProperty>> {
        let value = self.json(wire::relations(&self.base.base, uri)?).await?;
        wire::parse_relations(&value)
    }

    /// Labels (including aliases) of an entity.
    pub async fn labels(
        &self,
        uri: &str,
        locale: Option<&LocaleCode>,
    ) -> ServiceResult<Vec<Label>> {
        let value = self.json(wire::labels(&self.base.base, uri, locale)?).await?;
        wire::parse_labels(&value)
    }

    /// Data properties of an entity.
    pub async fn literals(
        &self,
        uri: &str,
        locale: Option<&LocaleCode>,
    ) -> ServiceResult<Vec<DataProperty>> {
        let value = self.json(wire::literals(&self.base.base, uri, locale)?).await?;
        wire::parse_literals(&value)
    }

    /// Upload an entity image from bytes.
    pub async fn set_entity_image(
        &self,
        uri: &str,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> ServiceResult<String> {
        let value = self
            .json(wire::set_image_bytes(
                &self.base.base,
                uri,
                data,
                file_name,
                mime_type,
            )?)
            .await?;
        wire::parse_image_id(&value)
    }

    /// Let the backend fetch the entity image from a URL.
    pub async fn set_entity_image_url(
        &self,
        uri: &str,
        image_url: &str,
        mime_type: Option<&str>,
    ) -> ServiceResult<String> {
        let value = self
            .json(wire::set_image_url(&self.base.base, uri, image_url, mime_type)?)
            .await?;
        wire::parse_image_id(&value)
    }

    /// One page of the entity listing.
    pub async fn listing(&self, filter: &ListingFilter) -> ServiceResult<EntityPage> {
        let value = self.json(wire::listing(&self.base.base, filter)?).await?;
        wire::parse_listing(&value)
    }

    /// Iterate a listing across pages; see [`crate::listing`].
    pub fn iter_listing(&self, filter: ListingFilter) -> crate::listing::EntityIterator {
        crate::listing::EntityIterator::new(self.clone(), filter)
    }

    pub async fn search_labels(
        &self,
        term: &str,
        locale: &LocaleCode,
        exact_match: bool,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self
            .json(wire::search_labels(
                &self.base.base,
                term,
                locale,
                exact_match,
                page_token,
            )?)
            .await?;
        wire::parse_search_page(&value)
    }

    pub async fn search_description(
        &self,
        term: &str,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self
            .json(wire::search_description(
                &self.base.base,
                term,
                locale,
                page_token,
            )?)
            .await?;
        wire::parse_search_page(&value)
    }

    pub async fn search_literals(
        &self,
        term: &str,
        property: &OntologyPropertyReference,
        pattern: SearchPattern,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self
            .json(wire::search_literals(
                &self.base.base,
                term,
                property,
                pattern,
                locale,
                page_token,
            )?)
            .await?;
        wire::parse_search_page(&value)
    }

    /// Search by relation; exactly one of `subject_uri`/`object_uri`.
    pub async fn search_relation(
        &self,
        subject_uri: Option<&str>,
        relation: &OntologyPropertyReference,
        object_uri: Option<&str>,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self
            .json(wire::search_relation(
                &self.base.base,
                subject_uri,
                relation,
                object_uri,
                locale,
                page_token,
            )?)
            .await?;
        wire::parse_search_page(&value)
    }

    /// Induced subgraph around seed URIs up to `depth` hops.
    pub async fn activations(&self, uris: &[&str], depth: u32) -> ServiceResult<Activation> {
        let value = self
            .json(wire::activations(&self.base.base, uris, depth)?)
            .await?;
        wire::parse_activation(&value)
    }

    /// Named-entity linking against the caller's accessible subgraph.
    pub async fn link_personal_entities(
        &self,
        text: &str,
        locale: &LocaleCode,
    ) -> ServiceResult<Vec<LinkedEntityMention>> {
        let value = self
            .json(wire::link_entities(&self.base.base, text, locale)?)
            .await?;
        wire::parse_mentions(&value)
    }

    /// Ask the graph service to reload the current ontology context.
    pub async fn ontology_update(&self) -> ServiceResult<()> {
        self.empty(wire::ontology_update(&self.base.base)?).await
    }

    /// Add indexing targets to an entity; returns per-target outcomes.
    pub async fn add_entity_index(
        &self,
        uri: &str,
        targets: &[IndexTarget],
    ) -> ServiceResult<HashMap<String, String>> {
        let value = self
            .json(wire::add_index_targets(&self.base.base, uri, targets)?)
            .await?;
        wire::parse_index_outcomes(&value)
    }

    /// Remove indexing targets from an entity.
    pub async fn remove_entity_index(
        &self,
        uri: &str,
        targets: &[IndexTarget],
    ) -> ServiceResult<HashMap<String, String>> {
        let value = self
            .json(wire::remove_index_targets(&self.base.base, uri, targets)?)
            .await?;
        wire::parse_index_outcomes(&value)
    }

    /// Submit entities for asynchronous bulk import; returns the job id.
    pub async fn import_entities(&self, entities: &[ThingObject]) -> ServiceResult<String> {
        let value = self
            .json(wire::import_entities(&self.base.base, entities)?)
            .await?;
        wire::parse_job_id(&value)
    }

    /// Progress snapshot of a bulk-import job.
    pub async fn job_status(&self, job_id: &str) -> ServiceResult<crate::models::ImportJob> {
        let value = self.json(wire::job_status(&self.base.base, job_id)?).await?;
        wire::parse_job(&value)
    }

    /// One page of the new-URI map for a completed job.
    pub async fn import_new_uris(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::NewUrisPage> {
        let value = self
            .json(wire::import_new_uris(&self.base.base, job_id, page_id)?)
            .await?;
        wire::parse_uris_page(&value)
    }

    /// One page of the per-entity error log of a job.
    pub async fn import_error_log(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::ErrorLogPage> {
        let value = self
            .json(wire::import_error_log(&self.base.base, job_id, page_id)?)
            .await?;
        wire::parse_error_page(&value)
    }
}

/// Blocking knowledge-graph client.
#[derive(Clone)]
pub struct BlockingGraphClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingGraphClient {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        Ok(Self {
            base: BlockingClientBase::new(config)?,
        })
    }

    pub fn core(&self) -> &BlockingClientBase {
        &self.base
    }

    pub fn core_mut(&mut self) -> &mut BlockingClientBase {
        &mut self.base
    }

    fn json(&self, spec: RequestSpec) -> ServiceResult<Value> {
        self.base
            .transport
            .execute_json(spec, self.base.auth()?, CallOptions::default())
    }

    fn empty(&self, spec: RequestSpec) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(spec, self.base.auth()?, CallOptions::default())
    }

    pub fn create_entity(&self, entity: &ThingObject) -> ServiceResult<String> {
        let value = self.json(wire::create_entity(&self.base.base, entity)?)?;
        wire::parse_uri(&value)
    }

    pub fn create_entities(&self, entities: &[ThingObject]) -> ServiceResult<Vec<ThingObject>> {
        let value = self.json(wire::create_entities(&self.base.base, entities)?)?;
        wire::parse_entity_list(&value)
    }

    pub fn update_entity(&self, entity: &ThingObject) -> ServiceResult<()> {
        self.empty(wire::update_entity(&self.base.base, entity)?)
    }

    pub fn delete_entity(&self, uri: &str, force: bool) -> ServiceResult<()> {
        self.empty(wire::delete_entity(&self.base.base, uri, force)?)
    }

    pub fn delete_entities(&self, uris: &[&str], force: bool) -> ServiceResult<()> {
        self.empty(wire::delete_entities(&self.base.base, uris, force)?)
    }

    pub fn entity(&self, uri: &str) -> ServiceResult<ThingObject> {
        let value = self.json(wire::get_entity(&self.base.base, uri)?)?;
        wire::parse_entity(&value)
    }

    pub fn entities_by_uris(&self, uris: &[&str]) -> ServiceResult<Vec<ThingObject>> {
        let value = self.json(wire::get_entities(&self.base.base, uris)?)?;
        wire::parse_entity_list(&value)
    }

    pub fn relations(
        &self,
        uri: &str,
    ) -> ServiceResult<HashMap<OntologyPropertyReference, ObjectProperty>> {
        let value = self.json(wire::relations(&self.base.base, uri)?)?;
        wire::parse_relations(&value)
    }

    pub fn labels(&self, uri: &str, locale: Option<&LocaleCode>) -> ServiceResult<Vec<Label>> {
        let value = self.json(wire::labels(&self.base.base, uri, locale)?)?;
        wire::parse_labels(&value)
    }

    pub fn literals(
        &self,
        uri: &str,
        locale: Option<&LocaleCode>,
    ) -> ServiceResult<Vec<DataProperty>> {
        let value = self.json(wire::literals(&self.base.base, uri, locale)?)?;
        wire::parse_literals(&value)
    }

    pub fn set_entity_image(
        &self,
        uri: &str,
        data: Vec<u8>,
        file_name: &str,
        mime_type: &str,
    ) -> ServiceResult<String> {
        let value = self.json(wire::set_image_bytes(
            &self.base.base,
            uri,
            data,
            file_name,
            mime_type,
        )?)?;
        wire::parse_image_id(&value)
    }

    pub fn set_entity_image_url(
        &self,
        uri: &str,
        image_url: &str,
        mime_type: Option<&str>,
    ) -> ServiceResult<String> {
        let value =
            self.json(wire::set_image_url(&self.base.base, uri, image_url, mime_type)?)?;
        wire::parse_image_id(&value)
    }

    pub fn listing(&self, filter: &ListingFilter) -> ServiceResult<EntityPage> {
        let value = self.json(wire::listing(&self.base.base, filter)?)?;
        wire::parse_listing(&value)
    }

    /// Iterate a listing across pages; see [`crate::listing`].
    pub fn iter_listing(
        &self,
        filter: ListingFilter,
    ) -> crate::listing::BlockingEntityIterator {
        crate::listing::BlockingEntityIterator::new(self.clone(), filter)
    }

    pub fn search_labels(
        &self,
        term: &str,
        locale: &LocaleCode,
        exact_match: bool,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self.json(wire::search_labels(
            &self.base.base,
            term,
            locale,
            exact_match,
            page_token,
        )?)?;
        wire::parse_search_page(&value)
    }

    pub fn search_description(
        &self,
        term: &str,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self.json(wire::search_description(
            &self.base.base,
            term,
            locale,
            page_token,
        )?)?;
        wire::parse_search_page(&value)
    }

    pub fn search_literals(
        &self,
        term: &str,
        property: &OntologyPropertyReference,
        pattern: SearchPattern,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self.json(wire::search_literals(
            &self.base.base,
            term,
            property,
            pattern,
            locale,
            page_token,
        )?)?;
        wire::parse_search_page(&value)
    }

    pub fn search_relation(
        &self,
        subject_uri: Option<&str>,
        relation: &OntologyPropertyReference,
        object_uri: Option<&str>,
        locale: &LocaleCode,
        page_token: Option<&str>,
    ) -> ServiceResult<SearchPage> {
        let value = self.json(wire::search_relation(
            &self.base.base,
            subject_uri,
            relation,
            object_uri,
            locale,
            page_token,
        )?)?;
        wire::parse_search_page(&value)
    }

    pub fn activations(&self, uris: &[&str], depth: u32) -> ServiceResult<Activation> {
        let value = self.json(wire::activations(&self.base.base, uris, depth)?)?;
        wire::parse_activation(&value)
    }

    pub fn link_personal_entities(
        &self,
        text: &str,
        locale: &LocaleCode,
    ) -> ServiceResult<Vec<LinkedEntityMention>> {
        let value = self.json(wire::link_entities(&self.base.base, text, locale)?)?;
        wire::parse_mentions(&value)
    }

    pub fn ontology_update(&self) -> ServiceResult<()> {
        self.empty(wire::ontology_update(&self.base.base)?)
    }

    pub fn add_entity_index(
        &self,
        uri: &str,
        targets: &[IndexTarget],
    ) -> ServiceResult<HashMap<String, String>> {
        let value = self.json(wire::add_index_targets(&self.base.base, uri, targets)?)?;
        wire::parse_index_outcomes(&value)
    }

    pub fn remove_entity_index(
        &self,
        uri: &str,
        targets: &[IndexTarget],
    ) -> ServiceResult<HashMap<String, String>> {
        let value = self.json(wire::remove_index_targets(&self.base.base, uri, targets)?)?;
        wire::parse_index_outcomes(&value)
    }

    pub fn import_entities(&self, entities: &[ThingObject]) -> ServiceResult<String> {
        let value = self.json(wire::import_entities(&self.base.base, entities)?)?;
        wire::parse_job_id(&value)
    }

    pub fn job_status(&self, job_id: &str) -> ServiceResult<crate::models::ImportJob> {
        let value = self.json(wire::job_status(&self.base.base, job_id)?)?;
        wire::parse_job(&value)
    }

    pub fn import_new_uris(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::NewUrisPage> {
        let value = self.json(wire::import_new_uris(&self.base.base, job_id, page_id)?)?;
        wire::parse_uris_page(&value)
    }

    pub fn import_error_log(
        &self,
        job_id: &str,
        page_id: Option<&str>,
    ) -> ServiceResult<crate::models::ErrorLogPage> {
        let value = self.json(wire::import_error_log(&self.base.base, job_id, page_id)?)?;
        wire::parse_error_page(&value)
    }
}
