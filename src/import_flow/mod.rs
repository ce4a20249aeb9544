//! Bulk-import orchestration and diff reconciliation.
//!
//! The orchestrator submits entities in chunks, polls each job to a
//! terminal state, collects the new-URI map and the error log page by
//! page, re-submits entities the server did not acknowledge, and
//! finally fetches every created entity back to compare it with what
//! was submitted.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    ImportErrorEntry, JobStatus, LocalizedContent, OntologyPropertyReference, ThingObject,
};
use crate::services::graph::{BlockingGraphClient, GraphClient};

/// Tuning for a bulk-import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Entities per job; `None` submits everything as one job.
    pub chunk_size: Option<usize>,
    /// Poll cadence; values below one second are clamped up.
    pub poll_interval: Duration,
    /// Also compare object-property targets during reconciliation.
    pub compare_object_properties: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: None,
            poll_interval: Duration::from_secs(1),
            compare_object_properties: false,
        }
    }
}

impl ImportOptions {
    fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(Duration::from_secs(1))
    }
}

/// One observed difference between the submitted entity and what the
/// graph stored.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDiff {
    /// What differs, e.g. `label-count` or `literal:wacom:core#name`.
    pub kind: String,
    /// Submitted-side value.
    pub submitted: Value,
    /// Graph-side value.
    pub stored: Value,
}

/// Reconciliation result for one created entity.
#[derive(Debug, Clone)]
pub struct EntityReconciliation {
    pub source_reference_id: String,
    pub uri: String,
    pub differences: Vec<EntityDiff>,
}

/// An entity the server never acknowledged and whose individual
/// re-submission failed as well.
#[derive(Debug)]
pub struct ImportFailure {
    pub source_reference_id: String,
    pub error: ServiceError,
}

/// Outcome of a bulk-import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub job_ids: Vec<String>,
    /// `source reference id -> created URI`.
    pub new_uris: HashMap<String, String>,
    /// Per-entity failures from the job error logs.
    pub error_log: Vec<ImportErrorEntry>,
    /// Source reference ids re-submitted via single create.
    pub resubmitted: Vec<String>,
    /// Entities that failed even the individual re-submission.
    pub failures: Vec<ImportFailure>,
    /// Differences found while comparing created entities.
    pub reconciliations: Vec<EntityReconciliation>,
}

impl ImportReport {
    /// URIs of everything that ended up in the graph.
    pub fn created_uris(&self) -> Vec<String> {
        self.new_uris.values().cloned().collect()
    }
}

fn locale_contents<T: LocalizedContent>(items: &[T]) -> HashMap<String, Vec<String>> {
    let mut by_locale: HashMap<String, Vec<String>> = HashMap::new();
    for item in items {
        by_locale
            .entry(item.locale().as_str().to_string())
            .or_default()
            .push(item.content().to_string());
    }
    for contents in by_locale.values_mut() {
        contents.sort();
    }
    by_locale
}

fn push_diff(diffs: &mut Vec<EntityDiff>, kind: impl Into<String>, submitted: Value, stored: Value) {
    diffs.push(EntityDiff {
        kind: kind.into(),
        submitted,
        stored,
    });
}

/// Compare a submitted entity with its stored counterpart.
///
/// Identical entities produce an empty list. List order is ignored;
/// the graph may normalize insertion order.
pub fn diff_entities(
    submitted: &ThingObject,
    stored: &ThingObject,
    compare_object_properties: bool,
) -> Vec<EntityDiff> {
    let mut diffs = Vec::new();

    if submitted.labels.len() != stored.labels.len() {
        push_diff(
            &mut diffs,
            "label-count",
            json!(submitted.labels.len()),
            json!(stored.labels.len()),
        );
    }
    if submitted.aliases.len() != stored.aliases.len() {
        push_diff(
            &mut diffs,
            "alias-count",
            json!(submitted.aliases.len()),
            json!(stored.aliases.len()),
        );
    }
    if submitted.descriptions.len() != stored.descriptions.len() {
        push_diff(
            &mut diffs,
            "description-count",
            json!(submitted.descriptions.len()),
            json!(stored.descriptions.len()),
        );
    }

    let submitted_labels = locale_contents(&submitted.labels);
    let stored_labels = locale_contents(&stored.labels);
    for (locale, contents) in &submitted_labels {
        let stored_contents = stored_labels.get(locale).cloned().unwrap_or_default();
        if *contents != stored_contents {
            push_diff(
                &mut diffs,
                format!("label:{}", locale),
                json!(contents),
                json!(stored_contents),
            );
        }
    }
    let submitted_descriptions = locale_contents(&submitted.descriptions);
    let stored_descriptions = locale_contents(&stored.descriptions);
    for (locale, contents) in &submitted_descriptions {
        let stored_contents = stored_descriptions.get(locale).cloned().unwrap_or_default();
        if *contents != stored_contents {
            push_diff(
                &mut diffs,
                format!("description:{}", locale),
                json!(contents),
                json!(stored_contents),
            );
        }
    }

    let flags = [
        ("use-nel", submitted.use_for_nel, stored.use_for_nel),
        (
            "use-vector-index",
            submitted.use_vector_index,
            stored.use_vector_index,
        ),
        (
            "use-vector-document-index",
            submitted.use_vector_index_document,
            stored.use_vector_index_document,
        ),
        (
            "use-full-text-index",
            submitted.use_full_text_index,
            stored.use_full_text_index,
        ),
    ];
    for (kind, submitted_flag, stored_flag) in flags {
        if submitted_flag != stored_flag {
            push_diff(&mut diffs, kind, json!(submitted_flag), json!(stored_flag));
        }
    }

    let mut properties: Vec<&OntologyPropertyReference> = submitted
        .data_properties
        .keys()
        .chain(stored.data_properties.keys())
        .collect();
    properties.sort();
    properties.dedup();
    for property in properties {
        let submitted_values: Vec<String> = {
            let mut values: Vec<String> = submitted
                .data_properties
                .get(property)
                .map(|v| v.iter().map(|p| p.value.clone()).collect())
                .unwrap_or_default();
            values.sort();
            values
        };
        let stored_values: Vec<String> = {
            let mut values: Vec<String> = stored
                .data_properties
                .get(property)
                .map(|v| v.iter().map(|p| p.value.clone()).collect())
                .unwrap_or_default();
            values.sort();
            values
        };
        if submitted_values.len() != stored_values.len() {
            push_diff(
                &mut diffs,
                format!("literal-count:{}", property.iri()),
                json!(submitted_values.len()),
                json!(stored_values.len()),
            );
        }
        if submitted_values != stored_values {
            push_diff(
                &mut diffs,
                format!("literal:{}", property.iri()),
                json!(submitted_values),
                json!(stored_values),
            );
        }
    }

    if compare_object_properties {
        let mut relations: Vec<&OntologyPropertyReference> = submitted
            .object_properties
            .keys()
            .chain(stored.object_properties.keys())
            .collect();
        relations.sort();
        relations.dedup();
        for relation in relations {
            let collect = |entity: &ThingObject| -> Vec<String> {
                let mut targets = entity
                    .object_properties
                    .get(relation)
                    .map(|slot| slot.outgoing_ids())
                    .unwrap_or_default();
                targets.sort();
                targets
            };
            let submitted_targets = collect(submitted);
            let stored_targets = collect(stored);
            if submitted_targets != stored_targets {
                push_diff(
                    &mut diffs,
                    format!("relation:{}", relation.iri()),
                    json!(submitted_targets),
                    json!(stored_targets),
                );
            }
        }
    }

    diffs
}

fn chunked(entities: &[ThingObject], chunk_size: Option<usize>) -> Vec<&[ThingObject]> {
    match chunk_size {
        Some(size) if size > 0 => entities.chunks(size).collect(),
        _ => vec![entities],
    }
}

fn unacknowledged<'a>(
    entities: &'a [ThingObject],
    new_uris: &HashMap<String, String>,
) -> Vec<&'a ThingObject> {
    entities
        .iter()
        .filter(|entity| {
            entity
                .source_reference_id()
                .map(|reference| !new_uris.contains_key(&reference))
                .unwrap_or(true)
        })
        .collect()
}

/// Async bulk-import orchestrator.
pub struct ImportOrchestrator<'a> {
    client: &'a GraphClient,
    options: ImportOptions,
}

impl<'a> ImportOrchestrator<'a> {
    pub fn new(client: &'a GraphClient, options: ImportOptions) -> Self {
        Self { client, options }
    }

    /// Run the whole import flow.
    ///
    /// Every entity gets a source reference id assigned if it lacks
    /// one; the orchestrator needs them to correlate job results.
    pub async fn run(&self, entities: &mut [ThingObject]) -> ServiceResult<ImportReport> {
        for entity in entities.iter_mut() {
            entity.ensure_source_reference_id();
        }
        let mut report = ImportReport::default();

        for chunk in chunked(entities, self.options.chunk_size) {
            let job_id = self.client.import_entities(chunk).await?;
            tracing::info!(job = %job_id, entities = chunk.len(), "bulk import submitted");
            let status = self.poll_job(&job_id).await?;
            if status == JobStatus::Failed {
                tracing::warn!(job = %job_id, "bulk import job failed");
            }
            self.collect_uris(&job_id, &mut report).await?;
            self.collect_errors(&job_id, &mut report).await?;
            report.job_ids.push(job_id);
        }

        // Entities the server did not acknowledge get one individual
        // retry through the single-create path.
        for entity in unacknowledged(entities, &report.new_uris) {
            let Some(reference) = entity.source_reference_id() else {
                continue;
            };
            match self.client.create_entity(entity).await {
                Ok(uri) => {
                    report.new_uris.insert(reference.clone(), uri);
                    report.resubmitted.push(reference);
                }
                Err(error) => {
                    tracing::warn!(reference = %reference, error = %error, "re-submission failed");
                    report.failures.push(ImportFailure {
                        source_reference_id: reference,
                        error,
                    });
                }
            }
        }

        self.reconcile(entities, &mut report).await?;
        Ok(report)
    }

    async fn poll_job(&self, job_id: &str) -> ServiceResult<JobStatus> {
        let interval = self.options.effective_poll_interval();
        loop {
            let job = self.client.job_status(job_id).await?;
            if job.status.is_terminal() {
                return Ok(job.status);
            }
            tracing::debug!(
                job = %job_id,
                processed = job.processed_entities,
                "import job still running"
            );
            tokio::time::sleep(interval).await;
        }
    }

    async fn collect_uris(&self, job_id: &str, report: &mut ImportReport) -> ServiceResult<()> {
        let mut page_id: Option<String> = None;
        loop {
            let page = self
                .client
                .import_new_uris(job_id, page_id.as_deref())
                .await?;
            let empty = page.uris.is_empty();
            report.new_uris.extend(page.uris);
            match page.next_page_id {
                Some(next) if !empty => page_id = Some(next),
                _ => return Ok(()),
            }
        }
    }

    async fn collect_errors(&self, job_id: &str, report: &mut ImportReport) -> ServiceResult<()> {
        let mut page_id: Option<String> = None;
        loop {
            let page = self
                .client
                .import_error_log(job_id, page_id.as_deref())
                .await?;
            let empty = page.errors.is_empty();
            report.error_log.extend(page.errors);
            match page.next_page_id {
                Some(next) if !empty => page_id = Some(next),
                _ => return Ok(()),
            }
        }
    }

    async fn reconcile(
        &self,
        entities: &[ThingObject],
        report: &mut ImportReport,
    ) -> ServiceResult<()> {
        for entity in entities {
            let Some(reference) = entity.source_reference_id() else {
                continue;
            };
            let Some(uri) = report.new_uris.get(&reference).cloned() else {
                continue;
            };
            let stored = self.client.entity(&uri).await?;
            let differences =
                diff_entities(entity, &stored, self.options.compare_object_properties);
            if !differences.is_empty() {
                report.reconciliations.push(EntityReconciliation {
                    source_reference_id: reference,
                    uri,
                    differences,
                });
            }
        }
        Ok(())
    }
}

/// Blocking bulk-import orchestrator.
pub struct BlockingImportOrchestrator<'a> {
    client: &'a BlockingGraphClient,
    options: ImportOptions,
}

impl<'a> BlockingImportOrchestrator<'a> {
    pub fn new(client: &'a BlockingGraphClient, options: ImportOptions) -> Self {
        Self { client, options }
    }

    pub fn run(&self, entities: &mut [ThingObject]) -> ServiceResult<ImportReport> {
        for entity in entities.iter_mut() {
            entity.ensure_source_reference_id();
        }
        let mut report = ImportReport::default();

        for chunk in chunked(entities, self.options.chunk_size) {
            let job_id = self.client.import_entities(chunk)?;
            tracing::info!(job = %job_id, entities = chunk.len(), "bulk import submitted");
            let status = self.poll_job(&job_id)?;
            if status == JobStatus::Failed {
                tracing::warn!(job = %job_id, "bulk import job failed");
            }
            self.collect_uris(&job_id, &mut report)?;
            self.collect_errors(&job_id, &mut report)?;
            report.job_ids.push(job_id);
        }

        for entity in unacknowledged(entities, &report.new_uris) {
            let Some(reference) = entity.source_reference_id() else {
                continue;
            };
            match self.client.create_entity(entity) {
                Ok(uri) => {
                    report.new_uris.insert(reference.clone(), uri);
                    report.resubmitted.push(reference);
                }
                Err(error) => {
                    tracing::warn!(reference = %reference, error = %error, "re-submission failed");
                    report.failures.push(ImportFailure {
                        source_reference_id: reference,
                        error,
                    });
                }
            }
        }

        self.reconcile(entities, &mut report)?;
        Ok(report)
    }

    fn poll_job(&self, job_id: &str) -> ServiceResult<JobStatus> {
        let interval = self.options.effective_poll_interval();
        loop {
            let job = self.client.job_status(job_id)?;
            if job.status.is_terminal() {
                return Ok(job.status);
            }
            std::thread::sleep(interval);
        }
    }

    fn collect_uris(&self, job_id: &str, report: &mut ImportReport) -> ServiceResult<()> {
        let mut page_id: Option<String> = None;
        loop {
            let page = self.client.import_new_uris(job_id, page_id.as_deref())?;
            let empty = page.uris.is_empty();
            report.new_uris.extend(page.uris);
            match page.next_page_id {
                Some(next) if !empty => page_id = Some(next),
                _ => return Ok(()),
            }
        }
    }

    fn collect_errors(&self, job_id: &str, report: &mut ImportReport) -> ServiceResult<()> {
        let mut page_id: Option<String> = None;
        loop {
            let page = self.client.import_error_log(job_id, page_id.as_deref())?;
            let empty = page.errors.is_empty();
            report.error_log.extend(page.errors);
            match page.next_page_id {
                Some(next) if !empty => page_id = Some(next),
                _ => return Ok(()),
            }
        }
    }

    fn reconcile(&self, entities: &[ThingObject], report: &mut ImportReport) -> ServiceResult<()> {
        for entity in entities {
            let Some(reference) = entity.source_reference_id() else {
                continue;
            };
            let Some(uri) = report.new_uris.get(&reference).cloned() else {
                continue;
            };
            let stored = self.client.entity(&uri)?;
            let differences =
                diff_entities(entity, &stored, self.options.compare_object_properties);
            if !differences.is_empty() {
                report.reconciliations.push(EntityReconciliation {
                    source_reference_id: reference,
                    uri,
                    differences,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DataProperty, Description, Label, LocaleCode, OntologyClassReference, RelationTarget,
    };

    fn ada() -> ThingObject {
        let mut entity =
            ThingObject::new(OntologyClassReference::new("wacom", "core", "Person"));
        entity
            .add_label(Label::main("Ada Lovelace", LocaleCode::en_us()))
            .unwrap();
        entity.add_alias(Label::alias("Ada", LocaleCode::en_us()));
        entity
            .descriptions
            .push(Description::new("First programmer", LocaleCode::en_us()));
        entity
            .add_data_property(DataProperty::new(
                "1815-12-10",
                OntologyPropertyReference::new("wacom", "core", "birthDate"),
                None,
            ))
            .unwrap();
        entity
    }

    #[test]
    fn identical_entities_diff_empty() {
        let submitted = ada();
        let stored = submitted.clone();
        assert!(diff_entities(&submitted, &stored, true).is_empty());
    }

    #[test]
    fn label_count_and_content_diffs() {
        let submitted = ada();
        let mut stored = submitted.clone();
        stored.labels[0].content = "Ada King".to_string();
        stored
            .add_label(Label::main("エイダ", LocaleCode::ja_jp()))
            .unwrap();
        let diffs = diff_entities(&submitted, &stored, false);
        assert!(diffs.iter().any(|d| d.kind == "label-count"));
        assert!(diffs.iter().any(|d| d.kind == "label:en_US"));
    }

    #[test]
    fn flag_diffs() {
        let submitted = ada();
        let mut stored = submitted.clone();
        stored.use_for_nel = !stored.use_for_nel;
        let diffs = diff_entities(&submitted, &stored, false);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, "use-nel");
    }

    #[test]
    fn literal_value_diffs_ignore_order() {
        let property = OntologyPropertyReference::new("wacom", "core", "alias");
        let mut submitted = ada();
        submitted
            .add_data_property(DataProperty::new("a", property.clone(), None))
            .unwrap();
        submitted
            .add_data_property(DataProperty::new("b", property.clone(), None))
            .unwrap();
        let mut stored = ada();
        stored
            .add_data_property(DataProperty::new("b", property.clone(), None))
            .unwrap();
        stored
            .add_data_property(DataProperty::new("a", property, None))
            .unwrap();
        assert!(diff_entities(&submitted, &stored, false).is_empty());
    }

    #[test]
    fn missing_literal_reports_count_and_values() {
        let property = OntologyPropertyReference::new("wacom", "core", "alias");
        let mut submitted = ada();
        submitted
            .add_data_property(DataProperty::new("a", property.clone(), None))
            .unwrap();
        let stored = ada();
        let diffs = diff_entities(&submitted, &stored, false);
        assert!(diffs
            .iter()
            .any(|d| d.kind == format!("literal-count:{}", property.iri())));
        assert!(diffs
            .iter()
            .any(|d| d.kind == format!("literal:{}", property.iri())));
    }

    #[test]
    fn relation_diffs_only_when_requested() {
        let relation = OntologyPropertyReference::new("wacom", "core", "links");
        let mut submitted = ada();
        submitted.set_relation(
            relation.clone(),
            vec![RelationTarget::from("wacom:entity:anchor")],
        );
        let stored = ada();
        assert!(diff_entities(&submitted, &stored, false).is_empty());
        let diffs = diff_entities(&submitted, &stored, true);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].kind, format!("relation:{}", relation.iri()));
    }

    #[test]
    fn chunking() {
        let entities: Vec<ThingObject> = (0..5).map(|_| ada()).collect();
        assert_eq!(chunked(&entities, None).len(), 1);
        assert_eq!(chunked(&entities, Some(2)).len(), 3);
        assert_eq!(chunked(&entities, Some(0)).len(), 1);
    }

    #[test]
    fn unacknowledged_filters_by_reference() {
        let mut acknowledged = ada();
        acknowledged.set_source_reference_id("ref-1");
        let mut missing = ada();
        missing.set_source_reference_id("ref-2");
        let uris = HashMap::from([("ref-1".to_string(), "wacom:entity:a".to_string())]);
        let entities = vec![acknowledged, missing];
        let pending = unacknowledged(&entities, &uris);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].source_reference_id().as_deref(), Some("ref-2"));
    }
}
