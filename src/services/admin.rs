//! Index and queue administration (tenant admins only).
//!
//! Index operations manage the vector/full-text store; the stream
//! endpoint exports every indexed document of the tenant as NDJSON.

use serde_json::{json, Map, Value};
use url::Url;

use super::base::{BlockingClientBase, ClientBase, ServiceConfig};
use crate::error::{ErrorEnvelope, ServiceError, ServiceResult};
use crate::models::VectorDocument;
use crate::transport::blocking::BlockingNdjsonLines;
use crate::transport::http::NdjsonLines;
use crate::transport::{CallOptions, RequestSpec};

/// Cluster and index health snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexHealth {
    #[serde(rename = "clusterStatus", default)]
    pub cluster_status: String,
    #[serde(rename = "indexStatus", default)]
    pub index_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shards: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Monitoring info for one ingestion queue.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QueueMonitor {
    pub name: String,
    #[serde(rename = "messageCount", default)]
    pub message_count: u64,
    #[serde(rename = "consumerCount", default)]
    pub consumer_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

pub(crate) mod wire {
    use super::*;

    pub fn index_health(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::post(crate::transport::join_url(
            base,
            &["api", "v1", "management", "index", "health", ""],
        )?))
    }

    pub fn index_refresh(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::post(crate::transport::join_url(
            base,
            &["api", "v1", "management", "index", "refresh", ""],
        )?))
    }

    pub fn index_optimize(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::post(crate::transport::join_url(
            base,
            &["api", "v1", "management", "index", "optimize", ""],
        )?))
    }

    pub fn index_stream(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::post(crate::transport::join_url(
            base,
            &["api", "v1", "management", "index", "stream", ""],
        )?))
    }

    pub fn delete_entries(base: &Url, ids: &[&str]) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(
            base,
            &["api", "v1", "management", "index", "entries", ""],
        )?;
        Ok(RequestSpec::delete(url).json(json!({ "ids": ids })))
    }

    pub fn queue_names(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["api", "v1", "queues", "names", ""],
        )?))
    }

    pub fn queues_all(base: &Url) -> ServiceResult<RequestSpec> {
        Ok(RequestSpec::get(crate::transport::join_url(
            base,
            &["api", "v1", "queues", "all", ""],
        )?))
    }

    pub fn queue_count(base: &Url, name: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "queues", "count", ""])?;
        Ok(RequestSpec::get(url).param("name", name))
    }

    pub fn queue_empty(base: &Url, name: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "queues", "empty", ""])?;
        Ok(RequestSpec::get(url).param("name", name))
    }

    pub fn queue_monitor(base: &Url, name: &str) -> ServiceResult<RequestSpec> {
        let url = crate::transport::join_url(base, &["api", "v1", "queues", "monitor", ""])?;
        Ok(RequestSpec::get(url).param("name", name))
    }

    pub fn parse_monitor(value: &Value) -> ServiceResult<QueueMonitor> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed queue monitor: {}", e), None))
    }

    pub fn parse_health(value: &Value) -> ServiceResult<IndexHealth> {
        serde_json::from_value(value.clone())
            .map_err(|e| ServiceError::parse(format!("malformed index health: {}", e), None))
    }

    pub fn parse_names(value: &Value) -> ServiceResult<Vec<String>> {
        let list = value.get("names").or_else(|| value.get("result")).unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed queue names: {}", e), None))
    }

    pub fn parse_monitors(value: &Value) -> ServiceResult<Vec<QueueMonitor>> {
        let list = value.get("queues").or_else(|| value.get("result")).unwrap_or(value);
        serde_json::from_value(list.clone())
            .map_err(|e| ServiceError::parse(format!("malformed queue monitors: {}", e), None))
    }

    pub fn parse_count(value: &Value) -> ServiceResult<u64> {
        value.get("count").and_then(Value::as_u64).ok_or_else(|| {
            ServiceError::parse("count response carries no 'count'", Some(value.to_string()))
        })
    }

    pub fn parse_empty(value: &Value) -> ServiceResult<bool> {
        value.get("empty").and_then(Value::as_bool).ok_or_else(|| {
            ServiceError::parse("response carries no 'empty'", Some(value.to_string()))
        })
    }

    /// Decode one NDJSON line; a line carrying `error` terminates the
    /// stream as a backend failure.
    pub fn parse_stream_line(url: &Url, line: &str) -> ServiceResult<VectorDocument> {
        let value: Value = serde_json::from_str(line).map_err(|e| {
            ServiceError::parse(
                format!("stream line is not JSON: {}", e),
                Some(line.chars().take(500).collect()),
            )
        })?;
        if value.get("error").is_some() {
            let envelope = ErrorEnvelope {
                method: "POST".to_string(),
                url: url.to_string(),
                status_code: 200,
                ..Default::default()
            }
            .with_response(line);
            return Err(ServiceError::Backend {
                envelope: Box::new(envelope),
            });
        }
        serde_json::from_value(value)
            .map_err(|e| ServiceError::parse(format!("malformed streamed document: {}", e), None))
    }
}

/// Streaming consumer of the async document export.
pub struct DocumentStream {
    lines: NdjsonLines,
    url: Url,
}

impl DocumentStream {
    /// Next document, or `None` at end of stream.
    pub async fn next_document(&mut self) -> ServiceResult<Option<VectorDocument>> {
        match self.lines.next_line().await? {
            Some(line) => wire::parse_stream_line(&self.url, &line).map(Some),
            None => Ok(None),
        }
    }
}

/// Streaming consumer of the blocking document export.
pub struct BlockingDocumentStream {
    lines: BlockingNdjsonLines,
    url: Url,
}

impl BlockingDocumentStream {
    pub fn next_document(&mut self) -> ServiceResult<Option<VectorDocument>> {
        match self.lines.next_line()? {
            Some(line) => wire::parse_stream_line(&self.url, &line).map(Some),
            None => Ok(None),
        }
    }
}

impl Iterator for BlockingDocumentStream {
    type Item = ServiceResult<VectorDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_document().transpose()
    }
}

/// Async index/queue administration client.
#[derive(Clone)]
pub struct IndexAdminClient {
    pub(crate) base: ClientBase,
}

impl IndexAdminClient {
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

    /// Cluster status, index status and per-shard/node stats.
    pub async fn index_health(&self) -> ServiceResult<IndexHealth> {
        let value = self.json(wire::index_health(&self.base.base)?).await?;
        wire::parse_health(&value)
    }

    /// Force visibility of recent writes.
    pub async fn index_refresh(&self) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::index_refresh(&self.base.base)?,
                self.base.auth()?,
                CallOptions::default(),
            )
            .await
    }

    /// Force-merge to optimize storage.
    pub async fn index_optimize(&self) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::index_optimize(&self.base.base)?,
                self.base.auth()?,
                CallOptions::default(),
            )
            .await
    }

    /// Stream every indexed document of the tenant.
    pub async fn stream_documents(&self) -> ServiceResult<DocumentStream> {
        let spec = wire::index_stream(&self.base.base)?;
        let url = spec.url.clone();
        let lines = self
            .base
            .transport
            .stream_lines(spec, self.base.auth()?, CallOptions::default())
            .await?;
        Ok(DocumentStream { lines, url })
    }

    /// Remove the listed documents from the index.
    pub async fn delete_index_entries(&self, ids: &[&str]) -> ServiceResult<()> {
        self.base
            .transport
            .execute_empty(
                wire::delete_entries(&self.base.base, ids)?,
                self.base.auth()?,
                CallOptions::default(),
            )
            .await
    }

    pub async fn queue_names(&self) -> ServiceResult<Vec<String>> {
        let value = self.json(wire::queue_names(&self.base.base)?).await?;
        wire::parse_names(&value)
    }

    /// All queues with their monitor info.
    pub async fn queues(&self) -> ServiceResult<Vec<QueueMonitor>> {
        let value = self.json(wire::queues_all(&self.base.base)?).await?;
        wire::parse_monitors(&value)
    }

    pub async fn queue_count(&self, name: &str) -> ServiceResult<u64> {
        let value = self.json(wire::queue_count(&self.base.base, name)?).await?;
        wire::parse_count(&value)
    }

    pub async fn queue_is_empty(&self, name: &str) -> ServiceResult<bool> {
        let value = self.json(wire::queue_empty(&self.base.base, name)?).await?;
        wire::parse_empty(&value)
    }

    /// Monitor detail for one queue.
    pub async fn queue_monitor(&self, name: &str) -> ServiceResult<QueueMonitor> {
        let value = self.json(wire::queue_monitor(&self.base.base, name)?).await?;
        wire::parse_monitor(&value)
    }
}

/// Blocking index/queue administration client.
#[derive(Clone)]
pub struct BlockingIndexAdminClient {
    pub(crate) base: BlockingClientBase,
}

impl BlockingIndexAdminClient {
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

    pub fn index_health(&self) -> ServiceResult<IndexHealth> {
        let value = self.json(wire::index_health(&self.base.base)?)?;
        wire::parse_health(&value)
    }

    pub fn index_refresh(&self) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::index_refresh(&self.base.base)?,
            self.base.auth()?,
            CallOptions::default(),
        )
    }

    pub fn index_optimize(&self) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::index_optimize(&self.base.base)?,
            self.base.auth()?,
            CallOptions::default(),
        )
    }

    pub fn stream_documents(&self) -> ServiceResult<BlockingDocumentStream> {
        let spec = wire::index_stream(&self.base.base)?;
        let url = spec.url.clone();
        let lines =
            self.base
                .transport
                .stream_lines(spec, self.base.auth()?, CallOptions::default())?;
        Ok(BlockingDocumentStream { lines, url })
    }

    pub fn delete_index_entries(&self, ids: &[&str]) -> ServiceResult<()> {
        self.base.transport.execute_empty(
            wire::delete_entries(&self.base.base, ids)?,
            self.base.auth()?,
            CallOptions::default(),
        )
    }

    pub fn queue_names(&self) -> ServiceResult<Vec<String>> {
        let value = self.json(wire::queue_names(&self.base.base)?)?;
        wire::parse_names(&value)
    }

    pub fn queues(&self) -> ServiceResult<Vec<QueueMonitor>> {
        let value = self.json(wire::queues_all(&self.base.base)?)?;
        wire::parse_monitors(&value)
    }

    pub fn queue_count(&self, name: &str) -> ServiceResult<u64> {
        let value = self.json(wire::queue_count(&self.base.base, name)?)?;
        wire::parse_count(&value)
    }

    pub fn queue_is_empty(&self, name: &str) -> ServiceResult<bool> {
        let value = self.json(wire::queue_empty(&self.base.base, name)?)?;
        wire::parse_empty(&value)
    }

    pub fn queue_monitor(&self, name: &str) -> ServiceResult<QueueMonitor> {
        let value = self.json(wire::queue_monitor(&self.base.base, name)?)?;
        wire::parse_monitor(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_line_with_error_terminates() {
        let url = Url::parse("https://vector.example.com/api/v1/management/index/stream/").unwrap();
        let err = wire::parse_stream_line(&url, r#"{"error": "index unavailable"}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Backend { .. }));
    }

    #[test]
    fn stream_line_parses_document() {
        let url = Url::parse("https://vector.example.com/api/v1/management/index/stream/").unwrap();
        let doc = wire::parse_stream_line(
            &url,
            r#"{"id": "d-1", "content": "text", "meta": {"locale": "en_US"}}"#,
        )
        .unwrap();
        assert_eq!(doc.id.as_deref(), Some("d-1"));
    }

    #[test]
    fn queue_endpoints() {
        let base = Url::parse("https://vector.example.com").unwrap();
        assert!(wire::queue_names(&base)
            .unwrap()
            .url
            .path()
            .ends_with("/api/v1/queues/names/"));
        assert!(wire::queue_count(&base, "ingest")
            .unwrap()
            .params
            .iter()
            .any(|(k, v)| k == "name" && v == "ingest"));
    }
}
