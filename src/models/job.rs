//! Bulk-import jobs: status, new-URI pages, error log.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a bulk-import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// True once the backend will not change the job anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Progress snapshot of a bulk-import job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: String,
    pub status: JobStatus,
    #[serde(rename = "processedEntities", default)]
    pub processed_entities: u64,
    #[serde(rename = "processedRelations", default)]
    pub processed_relations: u64,
    #[serde(rename = "processedImages", default)]
    pub processed_images: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "finishedAt", default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Severity of an import error-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportErrorSeverity {
    Warning,
    Error,
    Fatal,
}

/// One per-entity failure recorded during a bulk import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportErrorEntry {
    pub reason: String,
    pub severity: ImportErrorSeverity,
    /// Zero-based offset of the failed entity in the submitted list.
    pub position: u64,
    pub timestamp: DateTime<Utc>,
}

/// One page of newly created URIs, keyed by source reference id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUrisPage {
    #[serde(default)]
    pub uris: HashMap<String, String>,
    #[serde(rename = "nextPageId", default, skip_serializing_if = "Option::is_none")]
    pub next_page_id: Option<String>,
}

/// One page of the import error log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogPage {
    #[serde(default)]
    pub errors: Vec<ImportErrorEntry>,
    #[serde(rename = "nextPageId", default, skip_serializing_if = "Option::is_none")]
    pub next_page_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn job_wire_shape() {
        let job: ImportJob = serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "status": "RUNNING",
            "processedEntities": 5,
            "startedAt": "2026-01-01T10:00:00Z",
        }))
        .unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.processed_entities, 5);
        assert_eq!(job.finished_at, None);
    }

    #[test]
    fn uri_page_roundtrip() {
        let page: NewUrisPage = serde_json::from_value(serde_json::json!({
            "uris": {"ref-1": "wacom:entity:a", "ref-2": "wacom:entity:b"},
            "nextPageId": "p2",
        }))
        .unwrap();
        assert_eq!(page.uris.len(), 2);
        assert_eq!(page.next_page_id.as_deref(), Some("p2"));
    }
}
