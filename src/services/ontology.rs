//! Ontology service: contexts, concepts, properties, commit, export.
//!
//! After a successful [`OntologyClient::commit`] the caller must
//! notify the graph service via
//! [`crate::services::graph::GraphClient::ontology_update`] so it
//! reloads the committed context.

use serde_json::{json, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    OntologyClass, OntologyClassReference, OntologyContext, OntologyProperty,
    OntologyPropertyReference, PropertyKind,
};
use crate::transport::{CallOptions, RequestSpec};

/// Parameters for creating a new property.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub kind: PropertyKind,
    pub reference: OntologyPropertyReference,
    pub domains: Vec<OntologyClassReference>,
    /// Class IRIs for object properties, data-type IRIs for data ones.
    pub ranges: Vec<String>,
    pub inverse_of: Option<OntologyPropertyReference>,
    pub subproperty_of: Option<OntologyPropertyReference>,
}

pub(crate) mod wire {
    use super::*;

    pub fn contexts(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(base, &["context"])?))
    }

    pub fn context(base: &Url, name: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["context", name],
        )?))
    }

    pub fn create_context(base: &Url, context: &OntologyContext) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["context"])?;
        let body = serde_json::to_value(context).map_err(|e| {
            ServiceError::validation(format!("context cannot be serialized: {}", e))
        })?;
        Ok(RequestSpec::post(url).json(body))
    }

    pub fn concepts(base: &Url, context: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["context", context, "concepts"],
        )?))
    }

    pub fn concept(
        base: &Url,
        context: &str,
        reference: &OntologyClassReference,
    ) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["context", context, "concepts", &reference.iri()],
        )?))
    }

    pub fn create_concept(
        base: &Url,
        context: &str,
        concept: &OntologyClass,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["context", context, "concepts"])?;
        let body = serde_json::to_value(concept).map_err(|e| {
            ServiceError::validation(format!("concept cannot be serialized: {}", e))
        })?;
        Ok(RequestSpec::post(url).json(body))
    }

    pub fn properties(base: &Url, context: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["context", context, "properties"],
        )?))
    }

    pub fn property(
        base: &Url,
        context: &str,
        reference: &OntologyPropertyReference,
    ) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["context", context, "properties", &reference.iri()],
        )?))
    }

    pub fn create_property(
        base: &Url,
        context: &str,
        property: &NewProperty,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["context", context, "properties"])?;
        let mut body = json!({
            "kind": property.kind,
            "ref": property.reference.iri(),
            "domains": property.domains.iter().map(|d| d.iri()).collect::<Vec<_>>(),
            "ranges": property.ranges,
        });
        if let Some(ref inverse) = property.inverse_of {
            body["inverseOf"] = Value::String(inverse.iri());
        }
        if let Some(ref parent) = property.subproperty_of {
            body["subPropertyOf"] = Value::String(parent.iri());
        }
        Ok(RequestSpec::post(url).json(body))
    }

    pub fn commit(base: &Url, context: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::post(crate::transport::join_url(
            base,
            &["context", context, "commit"],
        )?))
    }

    pub fn rdf_export(base: &Url, context: &str) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["context", context, "versions", "rdf"],
        )?))
    }

    pub fn parse_contexts(value: &Value) -> ServiceResult<Vec<OntologyContext>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed context list: {}", e), None))
    }

    pub fn parse_context(value: &Value) -> ServiceResult<OntologyContext> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed context: {}", e), None))
    }

    pub fn parse_concepts(value: &Value) -> ServiceResult<Vec<OntologyClass>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed concept list: {}", e), None))
    }

    pub fn parse_concept(value: &Value) -> ServiceResult<OntologyClass> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed concept: {}", e), None))
    }

    pub fn parse_properties(value: &Value) -> ServiceResult<Vec<OntologyProperty>> {
        let list = value.get("result").unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed property list: {}", e), None))
    }

    pub fn parse_property(value: &Value) -> ServiceResult<OntologyProperty> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed property: {}", e), None))
    }
}

/// Async ontology client.
#[derive(Clone)]
pub struct OntologyClient {
    pub(crate) base: ClientBase,
}

impl OntologyClient {
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

    /// All ontology contexts visible to the caller.
    pub async fn contexts(&self) -> ServiceResult<Vec<OntologyContext>> {
        let value = self.json(wire::contexts(&self.base.base)?).await?;
        wire::parse_contexts(&value)
    }

    /// Metadata of one context.
    pub async fn context(&self, name: &str) -> ServiceResult<OntologyContext> {
        let value = self.json(wire::context(&self.base.base, name)?).await?;
        wire::parse_context(&value)
    }

    pub async fn create_context(
        &self,
        context: &OntologyContext,
    ) -> ServiceResult<OntologyContext> {
        let value = self
            .json(wire::create_context(&self.base.base, context)?)
            .await?;
        wire::parse_context(&value)
    }

    /// Class hierarchy of a context.
    pub async fn concepts(&self, context: &str) -> ServiceResult<Vec<OntologyClass>> {
        let value = self.json(wire::concepts(&self.base.base, context)?).await?;
        wire::parse_concepts(&value)
    }

    pub async fn concept(
        &self,
        context: &str,
        reference: &OntologyClassReference,
    ) -> ServiceResult<OntologyClass> {
        let value = self
            .json(wire::concept(&self.base.base, context, reference)?)
            .await?;
        wire::parse_concept(&value)
    }

    pub async fn create_concept(
        &self,
        context: &str,
        concept: &OntologyClass,
    ) -> ServiceResult<OntologyClass> {
        let value = self
            .json(wire::create_concept(&self.base.base, context, concept)?)
            .await?;
        wire::parse_concept(&value)
    }

    /// Properties of a context, with sub/superproperty links.
    pub async fn properties(&self, context: &str) -> ServiceResult<Vec<OntologyProperty>> {
        let value = self.json(wire::properties(&self.base.base, context)?).await?;
        wire::parse_properties(&value)
    }

    pub async fn property(
        &self,
        context: &str,
        reference: &OntologyPropertyReference,
    ) -> ServiceResult<OntologyProperty> {
        let value = self
            .json(wire::property(&self.base.base, context, reference)?)
            .await?;
        wire::parse_property(&value)
    }

    pub async fn create_property(
        &self,
        context: &str,
        property: &NewProperty,
    ) -> ServiceResult<OntologyProperty> {
        let value = self
            .json(wire::create_property(&self.base.base, context, property)?)
            .await?;
        wire::parse_property(&value)
    }

    /// Promote staged changes to the active version.
    pub async fn commit(&self, context: &str) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::commit(&self.base.base, context)?,
                self.base.auth()?,
                CallOptions::default(),
            )
            .await
    }

    /// Current context as an RDF/XML document.
    pub async fn rdf_export(&self, context: &str) -> ServiceResult<String> {
        self.base
            .transport
            .execute_text(
                wire::rdf_export(&self.base.base, context)?,
                self.base.auth()?,
                CallOptions::default(),
            )
            .await
    }
}

/// Blocking ontology client.
#[derive(Clone)]
pub struct BlockingOntologyClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingOntologyClient {
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

    pub fn contexts(&self) -> ServiceResult<Vec<OntologyContext>> {
        let value = self.json(wire::contexts(&self.base.base)?)?;
        wire::parse_contexts(&value)
    }

    pub fn context(&self, name: &str) -> ServiceResult<OntologyContext> {
        let value = self.json(wire::context(&self.base.base, name)?)?;
        wire::parse_context(&value)
    }

    pub fn create_context(&self, context: &OntologyContext) -> ServiceResult<OntologyContext> {
        let value = self.json(wire::create_context(&self.base.base, context)?)?;
        wire::parse_context(&value)
    }

    pub fn concepts(&self, context: &str) -> ServiceResult<Vec<OntologyClass>> {
        let value = self.json(wire::concepts(&self.base.base, context)?)?;
        wire::parse_concepts(&value)
    }

    pub fn concept(
        &self,
        context: &str,
        reference: &OntologyClassReference,
    ) -> ServiceResult<OntologyClass> {
        let value = self.json(wire::concept(&self.base.base, context, reference)?)?;
        wire::parse_concept(&value)
    }

    pub fn create_concept(
        &self,
        context: &str,
        concept: &OntologyClass,
    ) -> ServiceResult<OntologyClass> {
        let value = self.json(wire::create_concept(&self.base.base, context, concept)?)?;
        wire::parse_concept(&value)
    }

    pub fn properties(&self, context: &str) -> ServiceResult<Vec<OntologyProperty>> {
        let value = self.json(wire::properties(&self.base.base, context)?)?;
        wire::parse_properties(&value)
    }

    pub fn property(
        &self,
        context: &str,
        reference: &OntologyPropertyReference,
    ) -> ServiceResult<OntologyProperty> {
        let value = self.json(wire::property(&self.base.base, context, reference)?)?;
        wire::parse_property(&value)
    }

    pub fn create_property(
        &self,
        context: &str,
        property: &NewProperty,
    ) -> ServiceResult<OntologyProperty> {
        let value = self.json(wire::create_property(&self.base.base, context, property)?)?;
        wire::parse_property(&value)
    }

    pub fn commit(&self, context: &str) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::commit(&self.base.base, context)?,
            self.base.auth()?,
            CallOptions::default(),
        )
    }

    pub fn rdf_export(&self, context: &str) -> ServiceResult<String> {
        self.base.transport.execute_text(
            wire::rdf_export(&self.base.base, context)?,
            self.base.auth()?,
            CallOptions::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_body_shape() {
        let base = Url::parse("https://kg.example.com/ontology/v1").unwrap();
        let property = NewProperty {
            kind: PropertyKind::Object,
            reference: OntologyPropertyReference::new("wacom", "core", "knows"),
            domains: vec![OntologyClassReference::new("wacom", "core", "Person")],
            ranges: vec!["wacom:core#Person".to_string()],
            inverse_of: Some(OntologyPropertyReference::new("wacom", "core", "knownBy")),
            subproperty_of: None,
        };
        let spec = wire::create_property(&base, "core", &property).unwrap();
        let crate::transport::RequestBody::Json(body) = &spec.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["ref"], "wacom:core#knows");
        assert_eq!(body["kind"], "objectProperty");
        assert_eq!(body["inverseOf"], "wacom:core#knownBy");
        assert!(body.get("subPropertyOf").is_none());
    }

    #[test]
    fn concept_url_embeds_iri() {
        let base = Url::parse("https://kg.example.com/ontology/v1").unwrap();
        let spec = wire::concept(
            &base,
            "core",
            &OntologyClassReference::new("wacom", "core", "Person"),
        )
        .unwrap();
        assert!(spec.url.path().contains("concepts"));
        assert!(spec.url.path().contains("wacom%3Acore%23Person") || spec.url.path().contains("wacom:core%23Person"));
    }
}
