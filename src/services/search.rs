//! Semantic (vector) search service: document and label search,
//! listings and counts.

use serde_json::{json, Map, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{FilterMode, LabelMatch, LocaleCode, VectorDocument};
use crate::transport::{CallOptions, RequestSpec};

/// Metadata predicate for filtered search and counts.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// `metadata key -> required value` pairs.
    pub terms: Map<String, Value>,
    pub mode: FilterMode,
}

impl SearchFilter {
    pub fn term(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.insert(key.into(), value.into());
        self
    }

    pub fn mode(mut self, mode: FilterMode) -> Self {
        self.mode = mode;
        self
    }
}

/// One page of raw document or label listings.
#[derive(Debug, Clone)]
pub struct DocumentListing {
    pub documents: Vec<VectorDocument>,
    pub next_page_token: Option<String>,
}

pub(crate) mod wire {
    use super::*;

    fn filter_body(filter: Option<&SearchFilter>) -> Value {
        match filter {
            Some(filter) => json!({
                "filter": Value::Object(filter.terms.clone()),
                "mode": filter.mode,
            }),
            None => Value::Null,
        }
    }

    pub fn search_documents(
        base: &Url,
        query: &str,
        locale: &LocaleCode,
        max_results: u32,
        filter: Option<&SearchFilter>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "documents", "search", ""])?;
        let mut body = json!({
            "query": query,
            "locale": locale.as_str(),
            "maxResults": max_results,
        });
        let filters = filter_body(filter);
        if !filters.is_null() {
            body["filters"] = filters;
        }
        Ok(RequestSpec::post(url).json(body))
    }

    pub fn search_labels(
        base: &Url,
        query: &str,
        locale: &LocaleCode,
        max_results: u32,
        filter: Option<&SearchFilter>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "labels", "match", ""])?;
        let mut body = json!({
            "query": query,
            "locale": locale.as_str(),
            "maxResults": max_results,
        });
        let filters = filter_body(filter);
        if !filters.is_null() {
            body["filters"] = filters;
        }
        Ok(RequestSpec::post(url).json(body))
    }

    pub fn list_documents(
        base: &Url,
        locale: &LocaleCode,
        page_token: Option<&str>,
        limit: Option<u32>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "documents", ""])?;
        Ok(RequestSpec::get(url)
            .param("locale", locale.as_str())
            .opt_param("nextPageToken", page_token.map(str::to_string))
            .opt_param("limit", limit.map(|l| l.to_string())))
    }

    pub fn list_labels(
        base: &Url,
        locale: &LocaleCode,
        page_token: Option<&str>,
        limit: Option<u32>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "labels", ""])?;
        Ok(RequestSpec::get(url)
            .param("locale", locale.as_str())
            .opt_param("nextPageToken", page_token.map(str::to_string))
            .opt_param("limit", limit.map(|l| l.to_string())))
    }

    pub fn count(
        base: &Url,
        kind: &str,
        locale: &LocaleCode,
        concept_type: Option<&str>,
    ) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", kind, "count", ""])?;
        Ok(RequestSpec::get(url)
            .param("locale", locale.as_str())
            .opt_param("conceptType", concept_type.map(str::to_string)))
    }

    pub fn count_filter(
        base: &Url,
        kind: &str,
        locale: &LocaleCode,
        filter: &SearchFilter,
    ) -> ServiceResult<RequestSpec> {
        let url =
            crate::transport::join_url(base, &["api", "v1", kind, "count", "filter", ""])?;
        Ok(RequestSpec::post(url).json(json!({
            "locale": locale.as_str(),
            "filter": Value::Object(filter.terms.clone()),
            "mode": filter.mode,
        })))
    }

    pub fn parse_documents(value: &Value) -> ServiceResult<Vec<VectorDocument>> {
        let list = value.get("results").or_else(|| value.get("result")).unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed document results: {}", e), None))
    }

    pub fn parse_document_listing(value: &Value) -> ServiceResult<DocumentListing> {
        let documents = parse_documents(value)?;
        let next_page_token = value
            .get("nextPageToken")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(DocumentListing {
            documents,
            next_page_token,
        })
    }

    pub fn parse_labels(value: &Value) -> ServiceResult<Vec<LabelMatch>> {
        let list = value.get("results").or_else(|| value.get("result")).unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed label results: {}", e), None))
    }

    pub fn parse_count(value: &Value) -> ServiceResult<u64> {
        value.get("count").and_then(Value::as_u64).ok_or_else(|| {
            ServiceError::parse("count response carries no 'count'", Some(value.to_string()))
        })
    }
}

/// Async semantic-search client.
#[derive(Clone)]
pub struct SemanticSearchClient {
    pub(crate) base: ClientBase,
}

impl SemanticSearchClient {
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

    /// Ranked document search; scores lie in `[0, 1]`.
    pub async fn search_documents(
        &self,
        query: &str,
        locale: &LocaleCode,
        max_results: u32,
        filter: Option<&SearchFilter>,
    ) -> ServiceResult<Vec<VectorDocument>> {
        let value = self
            .json(wire::search_documents(
                &self.base.base,
                query,
                locale,
                max_results,
                filter,
            )?)
            .await?;
        wire::parse_documents(&value)
    }

    /// Ranked label match; scores lie in `[0, 1]`.
    pub async fn search_labels(
        &self,
        query: &str,
        locale: &LocaleCode,
        max_results: u32,
        filter: Option<&SearchFilter>,
    ) -> ServiceResult<Vec<LabelMatch>> {
        let value = self
            .json(wire::search_labels(
                &self.base.base,
                query,
                locale,
                max_results,
                filter,
            )?)
            .await?;
        wire::parse_labels(&value)
    }

    /// Raw page of indexed documents.
    pub async fn list_documents(
        &self,
        locale: &LocaleCode,
        page_token: Option<&str>,
        limit: Option<u32>,
    ) -> ServiceResult<DocumentListing> {
        let value = self
            .json(wire::list_documents(&self.base.base, locale, page_token, limit)?)
            .await?;
        wire::parse_document_listing(&value)
    }

    /// Raw page of indexed labels.
    pub async fn list_labels(
        &self,
        locale: &LocaleCode,
        page_token: Option<&str>,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<LabelMatch>> {
        let value = self
            .json(wire::list_labels(&self.base.base, locale, page_token, limit)?)
            .await?;
        wire::parse_labels(&value)
    }

    pub async fn count_documents(
        &self,
        locale: &LocaleCode,
        concept_type: Option<&str>,
    ) -> ServiceResult<u64> {
        let value = self
            .json(wire::count(&self.base.base, "documents", locale, concept_type)?)
            .await?;
        wire::parse_count(&value)
    }

    pub async fn count_documents_filter(
        &self,
        locale: &LocaleCode,
        filter: &SearchFilter,
    ) -> ServiceResult<u64> {
        let value = self
            .json(wire::count_filter(&self.base.base, "documents", locale, filter)?)
            .await?;
        wire::parse_count(&value)
    }

    pub async fn count_labels(
        &self,
        locale: &LocaleCode,
        concept_type: Option<&str>,
    ) -> ServiceResult<u64> {
        let value = self
            .json(wire::count(&self.base.base, "labels", locale, concept_type)?)
            .await?;
        wire::parse_count(&value)
    }

    pub async fn count_labels_filter(
        &self,
        locale: &LocaleCode,
        filter: &SearchFilter,
    ) -> ServiceResult<u64> {
        let value = self
            .json(wire::count_filter(&self.base.base, "labels", locale, filter)?)
            .await?;
        wire::parse_count(&value)
    }
}

/// Blocking semantic-search client.
#[derive(Clone)]
pub struct BlockingSemanticSearchClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingSemanticSearchClient {
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

    pub fn search_documents(
        &self,
        query: &str,
        locale: &LocaleCode,
        max_results: u32,
        filter: Option<&SearchFilter>,
    ) -> ServiceResult<Vec<VectorDocument>> {
        let value = self.json(wire::search_documents(
            &self.base.base,
            query,
            locale,
            max_results,
            filter,
        )?)?;
        wire::parse_documents(&value)
    }

    pub fn search_labels(
        &self,
        query: &str,
        locale: &LocaleCode,
        max_results: u32,
        filter: Option<&SearchFilter>,
    ) -> ServiceResult<Vec<LabelMatch>> {
        let value = self.json(wire::search_labels(
            &self.base.base,
            query,
            locale,
            max_results,
            filter,
        )?)?;
        wire::parse_labels(&value)
    }

    pub fn list_documents(
        &self,
        locale: &LocaleCode,
        page_token: Option<&str>,
        limit: Option<u32>,
    ) -> ServiceResult<DocumentListing> {
        let value =
            self.json(wire::list_documents(&self.base.base, locale, page_token, limit)?)?;
        wire::parse_document_listing(&value)
    }

    pub fn list_labels(
        &self,
        locale: &LocaleCode,
        page_token: Option<&str>,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<LabelMatch>> {
        let value = self.json(wire::list_labels(&self.base.base, locale, page_token, limit)?)?;
        wire::parse_labels(&value)
    }

    pub fn count_documents(
        &self,
        locale: &LocaleCode,
        concept_type: Option<&str>,
    ) -> ServiceResult<u64> {
        let value = self.json(wire::count(&self.base.base, "documents", locale, concept_type)?)?;
        wire::parse_count(&value)
    }

    pub fn count_documents_filter(
        &self,
        locale: &LocaleCode,
        filter: &SearchFilter,
    ) -> ServiceResult<u64> {
        let value =
            self.json(wire::count_filter(&self.base.base, "documents", locale, filter)?)?;
        wire::parse_count(&value)
    }

    pub fn count_labels(
        &self,
        locale: &LocaleCode,
        concept_type: Option<&str>,
    ) -> ServiceResult<u64> {
        let value = self.json(wire::count(&self.base.base, "labels", locale, concept_type)?)?;
        wire::parse_count(&value)
    }

    pub fn count_labels_filter(
        &self,
        locale: &LocaleCode,
        filter: &SearchFilter,
    ) -> ServiceResult<u64> {
        let value = self.json(wire::count_filter(&self.base.base, "labels", locale, filter)?)?;
        wire::parse_count(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_body_carries_filters() {
        let base = Url::parse("https://vector.example.com").unwrap();
        let filter = SearchFilter::default()
            .term("conceptType", "wacom:core#Person")
            .mode(FilterMode::Or);
        let spec = wire::search_documents(&base, "ada", &LocaleCode::en_us(), 10, Some(&filter))
            .unwrap();
        let crate::transport::RequestBody::Json(body) = &spec.body else {
            panic!("expected a JSON body");
        };
        assert_eq!(body["query"], "ada");
        assert_eq!(body["filters"]["mode"], "OR");
        assert_eq!(body["filters"]["filter"]["conceptType"], "wacom:core#Person");
        assert!(spec.url.path().ends_with("/api/v1/documents/search/"));
    }

    #[test]
    fn count_parse() {
        assert_eq!(wire::parse_count(&json!({"count": 12})).unwrap(), 12);
        assert!(wire::parse_count(&json!({})).is_err());
    }
}
