//! Wires each entry in the dependency graph (§4.6.2) to a concrete
//! [`ComponentTask`]: fetch raw Jira payloads through [`jira_client::JiraClient`],
//! wrap them as [`SourceRecord`]s, map through `sanitizer`, and load through
//! `migrations`. The extraction (Jira fetch + `SourceRecord` wrapping) lives
//! here rather than in `migrations` because the sanitizer/migrations layers
//! only ever see already-wrapped records — this module is the boundary that
//! does the wrapping.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checkpoint::StateStore;
use migrations::journal::RawOperation;
use migrations::other_components as cross;
use migrations::work_packages::{self, JournalInput};
use migrations::{BatchCheckpoint, LoadReport, MigrationError, simple::run_simple_component};
use model::{
    Batch, JiraKey, MappedRecord, MappingCache, OperationKind, OriginId, RunId, SourceEntityKind, SourceRecord, Value,
};
use orchestrator::ComponentTask;
use provenance::ProvenanceStore;
use sanitizer::entities::work_packages as wp_sanitize;
use sanitizer::entities::{components, custom_fields, groups, issue_types, labels, priorities, projects, statuses, users, versions, workflows};
use sanitizer::{LinkResolver, MappingError};
use script_composer::{ScriptKind, compose_create};
use std::collections::{BTreeMap, hash_map::DefaultHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Everything every component task needs a handle to. One instance is built
/// in `main` and shared (via `Arc`) across every registered task.
pub struct Shared {
    pub jira: jira_client::JiraClient,
    pub provenance: ProvenanceStore,
    pub remote_temp_dir: String,
    pub timeout: Duration,
    pub batch_size: usize,
    pub base_url: String,
    pub project_keys: Vec<String>,
    pub resolver: RwLock<LinkResolver>,
    pub state_store: Arc<dyn StateStore>,
    pub run_id: RunId,
}

impl Shared {
    /// Refreshes the in-memory link cache for `kind` from OpenProject's own
    /// provenance tags (§4.4 `build_mapping_cache`) so the next tier's
    /// mappers can resolve references into the one just completed.
    async fn warm_resolver(&self, component: &str, kind: SourceEntityKind) -> Result<(), MigrationError> {
        let cache = self.provenance.build_mapping_cache(component, kind).await?;
        self.resolver.write().await.insert_cache(kind, cache);
        Ok(())
    }

    /// This task's handle onto its own batch-level fast-forward state
    /// (§4.5). `component` is the checkpoint key — callers looping over a
    /// sub-scope (e.g. `ProjectScopedTask` per project) qualify it so the
    /// same dependency-graph component name doesn't collide across scopes.
    fn checkpoint(&self, component: impl Into<String>) -> BatchCheckpoint<'_> {
        BatchCheckpoint::new(self.state_store.as_ref(), &self.run_id, component)
    }
}

fn numeric_origin_id(value: &serde_json::Value) -> OriginId {
    let id = value
        .get("id")
        .and_then(|v| v.as_str().and_then(|s| s.parse::<i64>().ok()).or_else(|| v.as_i64()));
    OriginId(id.unwrap_or(0))
}

fn hashed_origin_id(key: &str) -> OriginId {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    OriginId((hasher.finish() & 0x7fff_ffff_ffff_ffff) as i64)
}

fn wrap(kind: SourceEntityKind, value: serde_json::Value, origin_id: OriginId, key_field: Option<&str>) -> SourceRecord {
    let origin_key = key_field
        .and_then(|field| value.get(field))
        .and_then(|v| v.as_str())
        .map(JiraKey::new);
    SourceRecord::new(kind, origin_id, origin_key, value)
}

/// Every plain create-only entity (users, groups, custom fields, issue
/// types, statuses, priorities) shares this shape: fetch a flat list,
/// sanitize with a per-kind mapper, load via the shared generic path
/// (§4.6.1). `fetch` and `mapper` are the only things that vary per
/// component.
pub struct SimpleEntityTask {
    pub shared: Arc<Shared>,
    pub component: &'static str,
    pub kind: SourceEntityKind,
    pub origin_key_field: Option<&'static str>,
    pub fetch: FetchFn,
    pub mapper: MapperFn,
    /// Kind this component's own mapping cache should be warmed into once
    /// loaded, so later tiers can resolve against it. `None` for entities
    /// nothing downstream resolves by kind (e.g. custom fields).
    pub warm_as: Option<SourceEntityKind>,
}

type FetchFn = Arc<dyn Fn(jira_client::JiraClient) -> BoxFetch + Send + Sync>;
type BoxFetch = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Vec<serde_json::Value>, jira_client::JiraError>> + Send>>;
type MapperFn = Arc<dyn Fn(&SourceRecord, &str) -> Result<MappedRecord, MappingError> + Send + Sync>;

#[async_trait]
impl ComponentTask for SimpleEntityTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let raw = (self.fetch)(self.shared.jira.clone()).await?;
        let sources: Vec<SourceRecord> = raw
            .into_iter()
            .map(|value| {
                let origin_id = numeric_origin_id(&value);
                wrap(self.kind, value, origin_id, self.origin_key_field)
            })
            .collect();

        let mapper = self.mapper.clone();
        let base_url = self.shared.base_url.clone();
        let checkpoint = self.shared.checkpoint(self.component);
        let report = run_simple_component(
            self.component,
            self.kind,
            sources,
            move |source| mapper(source, &base_url),
            &self.shared.provenance,
            self.shared.provenance.evaluator(),
            &self.shared.remote_temp_dir,
            self.shared.batch_size,
            self.shared.timeout,
            &checkpoint,
        )
        .await?;

        if let Some(kind) = self.warm_as {
            self.shared.warm_resolver(self.component, kind).await?;
        }
        Ok(report)
    }
}

fn users_task(shared: Arc<Shared>) -> SimpleEntityTask {
    SimpleEntityTask {
        shared,
        component: "users",
        kind: SourceEntityKind::User,
        origin_key_field: Some("key"),
        fetch: Arc::new(|jira| Box::pin(async move { jira.list_users(1000).await })),
        mapper: Arc::new(|source, base_url| users::map(source, base_url)),
        warm_as: Some(SourceEntityKind::User),
    }
}

fn groups_task(shared: Arc<Shared>) -> SimpleEntityTask {
    SimpleEntityTask {
        shared,
        component: "groups",
        kind: SourceEntityKind::Group,
        origin_key_field: Some("name"),
        fetch: Arc::new(|jira| Box::pin(async move { jira.list_groups().await })),
        mapper: Arc::new(|source, base_url| groups::map(source, base_url)),
        warm_as: Some(SourceEntityKind::Group),
    }
}

fn custom_fields_task(shared: Arc<Shared>) -> SimpleEntityTask {
    SimpleEntityTask {
        shared,
        component: "custom_fields",
        kind: SourceEntityKind::CustomField,
        origin_key_field: Some("id"),
        fetch: Arc::new(|jira| Box::pin(async move { jira.list_custom_fields().await })),
        mapper: Arc::new(|source, base_url| custom_fields::map(source, base_url)),
        warm_as: None,
    }
}

fn issue_types_task(shared: Arc<Shared>) -> SimpleEntityTask {
    SimpleEntityTask {
        shared,
        component: "issue_types",
        kind: SourceEntityKind::IssueType,
        origin_key_field: None,
        fetch: Arc::new(|jira| Box::pin(async move { jira.list_issue_types().await })),
        mapper: Arc::new(|source, base_url| issue_types::map(source, base_url)),
        warm_as: Some(SourceEntityKind::IssueType),
    }
}

fn statuses_task(shared: Arc<Shared>) -> SimpleEntityTask {
    SimpleEntityTask {
        shared,
        component: "statuses",
        kind: SourceEntityKind::Status,
        origin_key_field: None,
        fetch: Arc::new(|jira| Box::pin(async move { jira.list_statuses().await })),
        mapper: Arc::new(|source, base_url| statuses::map(source, base_url)),
        warm_as: Some(SourceEntityKind::Status),
    }
}

/// Priorities need a stable ordinal (`position`), so they're mapped with
/// the fetch order itself rather than through the shared closure shape —
/// still dispatched through `run_simple_component` like every other simple
/// entity, just with `position` baked into the mapper closure per record.
pub struct PrioritiesTask {
    pub shared: Arc<Shared>,
}

#[async_trait]
impl ComponentTask for PrioritiesTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let raw = self.shared.jira.list_priorities().await?;
        let indexed: Vec<(i64, SourceRecord)> = raw
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let origin_id = numeric_origin_id(&value);
                (i as i64, wrap(SourceEntityKind::Priority, value, origin_id, None))
            })
            .collect();
        let positions: BTreeMap<model::OriginId, i64> = indexed.iter().map(|(pos, s)| (s.origin_id, *pos)).collect();
        let sources: Vec<SourceRecord> = indexed.into_iter().map(|(_, s)| s).collect();

        let base_url = self.shared.base_url.clone();
        let checkpoint = self.shared.checkpoint("priorities");
        let report = run_simple_component(
            "priorities",
            SourceEntityKind::Priority,
            sources,
            move |source| priorities::map(source, &base_url, positions.get(&source.origin_id).copied().unwrap_or(0)),
            &self.shared.provenance,
            self.shared.provenance.evaluator(),
            &self.shared.remote_temp_dir,
            self.shared.batch_size,
            self.shared.timeout,
            &checkpoint,
        )
        .await?;
        self.shared.warm_resolver("priorities", SourceEntityKind::Priority).await?;
        Ok(report)
    }
}

pub fn priorities_task(shared: Arc<Shared>) -> PrioritiesTask {
    PrioritiesTask { shared }
}

/// §4.6.5 "Projects": created as a sub-project under a configured parent,
/// with the lead resolved through the just-warmed user cache.
pub struct ProjectsTask {
    pub shared: Arc<Shared>,
    pub parent_id: i64,
}

#[async_trait]
impl ComponentTask for ProjectsTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let raw = self.shared.jira.list_projects().await?;
        let sources: Vec<SourceRecord> = raw
            .into_iter()
            .filter(|v| project_allowed(v, &self.shared.project_keys))
            .map(|value| {
                let origin_id = numeric_origin_id(&value);
                wrap(SourceEntityKind::Project, value, origin_id, Some("key"))
            })
            .collect();

        let parent_id = self.parent_id;
        let base_url = self.shared.base_url.clone();
        let resolver = self.shared.resolver.read().await.clone();
        let checkpoint = self.shared.checkpoint("projects");
        let report = run_simple_component(
            "projects",
            SourceEntityKind::Project,
            sources,
            move |source| projects::map(source, &base_url, parent_id, &resolver),
            &self.shared.provenance,
            self.shared.provenance.evaluator(),
            &self.shared.remote_temp_dir,
            self.shared.batch_size,
            self.shared.timeout,
            &checkpoint,
        )
        .await?;
        self.shared.warm_resolver("projects", SourceEntityKind::Project).await?;
        Ok(report)
    }
}

pub fn projects_task(shared: Arc<Shared>, parent_id: i64) -> ProjectsTask {
    ProjectsTask { shared, parent_id }
}

fn project_allowed(project: &serde_json::Value, filter: &[String]) -> bool {
    if filter.is_empty() {
        return true;
    }
    project.get("key").and_then(|v| v.as_str()).map(|key| filter.iter().any(|f| f == key)).unwrap_or(false)
}

/// §4.6.5 "Versions" / "Components": one Jira REST call per project, so
/// unlike the other simple entities these run a per-project fetch loop
/// inside a single component task rather than one flat fetch.
pub struct ProjectScopedTask {
    pub shared: Arc<Shared>,
    pub component: &'static str,
    pub kind: SourceEntityKind,
    pub fetch: Arc<dyn Fn(jira_client::JiraClient, String) -> BoxFetch + Send + Sync>,
    pub mapper: Arc<dyn Fn(&SourceRecord, &str, i64) -> Result<MappedRecord, MappingError> + Send + Sync>,
}

#[async_trait]
impl ComponentTask for ProjectScopedTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let mut report = LoadReport::default();
        let project_ids: Vec<(String, Option<i64>)> = {
            let resolver = self.shared.resolver.read().await;
            self.shared
                .project_keys
                .iter()
                .map(|key| (key.clone(), resolver.resolve(SourceEntityKind::Project, &JiraKey::new(key.as_str()))))
                .collect()
        };
        for (project_key, project_id) in project_ids {
            let Some(project_id) = project_id else {
                report.failed += 1;
                report.errors.push(format!("{project_key}: no migrated project id, skipping {}", self.component));
                continue;
            };
            let raw = (self.fetch)(self.shared.jira.clone(), project_key.clone()).await?;
            let sources: Vec<SourceRecord> = raw
                .into_iter()
                .map(|value| {
                    let origin_id = numeric_origin_id(&value);
                    wrap(self.kind, value, origin_id, None)
                })
                .collect();

            let mapper = self.mapper.clone();
            let base_url = self.shared.base_url.clone();
            // Qualified per project: `self.component` is reused across every
            // project this task loops over, so a bare checkpoint key would
            // have one project's progress overwrite another's.
            let checkpoint = self.shared.checkpoint(format!("{}:{project_key}", self.component));
            let sub_report = run_simple_component(
                self.component,
                self.kind,
                sources,
                move |source| mapper(source, &base_url, project_id),
                &self.shared.provenance,
                self.shared.provenance.evaluator(),
                &self.shared.remote_temp_dir,
                self.shared.batch_size,
                self.shared.timeout,
                &checkpoint,
            )
            .await?;
            report.merge(sub_report);
        }
        Ok(report)
    }
}

pub fn versions_task(shared: Arc<Shared>) -> ProjectScopedTask {
    ProjectScopedTask {
        shared,
        component: "versions",
        kind: SourceEntityKind::Version,
        fetch: Arc::new(|jira, key| Box::pin(async move { jira.list_project_versions(&key).await })),
        mapper: Arc::new(|source, base_url, project_id| versions::map(source, base_url, project_id)),
    }
}

pub fn components_task(shared: Arc<Shared>) -> ProjectScopedTask {
    ProjectScopedTask {
        shared,
        component: "components",
        kind: SourceEntityKind::Component,
        fetch: Arc::new(|jira, key| Box::pin(async move { jira.list_project_components(&key).await })),
        mapper: Arc::new(|source, base_url, project_id| components::map(source, base_url, project_id)),
    }
}

/// §4.6.5 "Labels": free-text strings, not REST entities — assigns each
/// distinct label a stable synthetic id from its text before mapping
/// (`labels::map` has no `SourceRecord`/`Result` shape, unlike every other
/// simple entity, so it can't go through `run_simple_component`'s closure).
pub struct LabelsTask {
    pub shared: Arc<Shared>,
}

#[async_trait]
impl ComponentTask for LabelsTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let raw = self.shared.jira.list_labels(1000).await?;
        let mut report = LoadReport::default();
        let mut mapped_records = Vec::new();

        for value in raw {
            let Some(label) = value.as_str() else { continue };
            let origin_id = hashed_origin_id(label);
            mapped_records.push(labels::map(label, origin_id, &self.shared.base_url));
        }

        // Batches are numbered over the full mapped list, not the
        // post-provenance-filter one, so checkpoint fast-forward (§4.5)
        // stays valid across restarts — see `migrations::simple`'s doc.
        let checkpoint = self.shared.checkpoint("labels");
        let start_index = checkpoint.start_index().await?;
        for batch in Batch::chunk(mapped_records, self.shared.batch_size.max(1)) {
            if batch.index.0 < start_index {
                continue;
            }

            let mut pending = Vec::with_capacity(batch.records.len());
            for record in batch.records {
                match self
                    .shared
                    .provenance
                    .find_by_provenance("labels", SourceEntityKind::Label, &record.provenance.origin_key)
                    .await?
                {
                    Some(_) => report.skipped += 1,
                    None => pending.push(record),
                }
            }

            if !pending.is_empty() {
                let input_path = format!("{}/j2o_input_labels_{}.json", self.shared.remote_temp_dir, batch.index);
                let result_path = format!("{}/j2o_result_labels_{}.json", self.shared.remote_temp_dir, batch.index);
                let composed = compose_create("labels", ScriptKind::GenericCreate, &pending, &input_path, &result_path)?;
                let result = self
                    .shared
                    .provenance
                    .evaluator()
                    .execute(&composed.script.full_source(), Some(&composed.input_payload), Some(&input_path), &result_path, self.shared.timeout)
                    .await?;
                report.merge(migrations::report_from_result(&result));
            }
            checkpoint.advance(batch.index).await?;
        }
        Ok(report)
    }
}

pub fn labels_task(shared: Arc<Shared>) -> LabelsTask {
    LabelsTask { shared }
}

/// §4.6.5 "Workflows": Jira models a workflow scheme; OpenProject models
/// `(type, old_status, new_status)` triples. The extractor reads whatever
/// transition entries the workflow payload carries (`transitions: [...]`)
/// and flattens them — a best-effort shape since the wire format here is
/// explicitly out of scope (§1).
pub struct WorkflowsTask {
    pub shared: Arc<Shared>,
}

#[async_trait]
impl ComponentTask for WorkflowsTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let raw = self.shared.jira.list_workflows().await?;
        let mut pending = Vec::new();
        let mut report = LoadReport::default();

        {
            let resolver = self.shared.resolver.read().await;
            for workflow in &raw {
                let issue_type_key = workflow.get("issueType").and_then(|v| v.as_str()).unwrap_or_default();
                let transitions = workflow.get("transitions").and_then(|v| v.as_array()).cloned().unwrap_or_default();
                for transition in transitions {
                    let from = transition.get("from").and_then(|v| v.as_str());
                    let to = transition.get("to").and_then(|v| v.as_str());
                    let (Some(from), Some(to)) = (from, to) else { continue };
                    let t = workflows::WorkflowTransition {
                        issue_type_key: issue_type_key.to_string(),
                        from_status_key: from.to_string(),
                        to_status_key: to.to_string(),
                    };
                    let origin_id = hashed_origin_id(&format!("{issue_type_key}:{from}:{to}"));
                    match workflows::map(&t, origin_id, &resolver) {
                        Ok(record) => pending.push(record),
                        Err(err) => {
                            report.failed += 1;
                            report.errors.push(err.to_string());
                        }
                    }
                }
            }
        }

        let checkpoint = self.shared.checkpoint("workflows");
        let start_index = checkpoint.start_index().await?;
        for batch in Batch::chunk(pending, self.shared.batch_size.max(1)) {
            if batch.index.0 < start_index {
                continue;
            }
            let input_path = format!("{}/j2o_input_workflows_{}.json", self.shared.remote_temp_dir, batch.index);
            let result_path = format!("{}/j2o_result_workflows_{}.json", self.shared.remote_temp_dir, batch.index);
            let composed = compose_create("workflows", ScriptKind::GenericCreate, &batch.records, &input_path, &result_path)?;
            let result = self
                .shared
                .provenance
                .evaluator()
                .execute(&composed.script.full_source(), Some(&composed.input_payload), Some(&input_path), &result_path, self.shared.timeout)
                .await?;
            report.merge(migrations::report_from_result(&result));
            checkpoint.advance(batch.index).await?;
        }
        Ok(report)
    }
}

pub fn workflows_task(shared: Arc<Shared>) -> WorkflowsTask {
    WorkflowsTask { shared }
}

fn issue_jql(project_keys: &[String]) -> String {
    if project_keys.is_empty() {
        "order by key asc".to_string()
    } else {
        format!("project in ({}) order by key asc", project_keys.join(","))
    }
}

/// §4.6.3 Phase 1: create one minimal work package per issue. Persists the
/// resulting `origin_key -> target_id` mapping into the shared resolver so
/// Phase 2, and every leaf component after it, can cross-reference issues.
pub struct WorkPackagesSkeletonTask {
    pub shared: Arc<Shared>,
}

#[async_trait]
impl ComponentTask for WorkPackagesSkeletonTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let jql = issue_jql(&self.shared.project_keys);
        let raw = self.shared.jira.fetch_all_issues(&jql, self.shared.batch_size as u32, &[]).await?;
        let sources: Vec<SourceRecord> = raw
            .into_iter()
            .map(|value| {
                let origin_id = numeric_origin_id(&value);
                wrap(SourceEntityKind::Issue, value, origin_id, Some("key"))
            })
            .collect();

        let resolver = self.shared.resolver.read().await.clone();
        let checkpoint = self.shared.checkpoint("work_packages_skeleton");
        let (report, mapping) = work_packages::run_skeleton(
            &sources,
            &self.shared.base_url,
            &resolver,
            &self.shared.provenance,
            self.shared.provenance.evaluator(),
            &self.shared.remote_temp_dir,
            self.shared.batch_size,
            self.shared.timeout,
            &checkpoint,
        )
        .await?;

        self.shared.resolver.write().await.insert_cache(SourceEntityKind::Issue, mapping);
        Ok(report)
    }
}

pub fn work_packages_skeleton_task(shared: Arc<Shared>) -> WorkPackagesSkeletonTask {
    WorkPackagesSkeletonTask { shared }
}

/// §4.6.3 Phase 2 + §4.6.4: fills in the remaining attributes (with
/// cross-references rewritten) and replays each work package's
/// reconstructed journal history in the same pass.
pub struct WorkPackagesContentTask {
    pub shared: Arc<Shared>,
    pub system_deleted_user_id: i64,
}

#[async_trait]
impl ComponentTask for WorkPackagesContentTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let jql = issue_jql(&self.shared.project_keys);
        let raw = self
            .shared
            .jira
            .fetch_all_issues(&jql, self.shared.batch_size as u32, &["changelog"])
            .await?;

        let resolver = self.shared.resolver.read().await.clone();
        let skeleton_mapping: MappingCache = self
            .shared
            .provenance
            .build_mapping_cache("work_packages_skeleton", SourceEntityKind::Issue)
            .await?;

        let sources: Vec<SourceRecord> = raw
            .iter()
            .cloned()
            .map(|value| {
                let origin_id = numeric_origin_id(&value);
                wrap(SourceEntityKind::Issue, value, origin_id, Some("key"))
            })
            .collect();

        let content_checkpoint = self.shared.checkpoint("work_packages_content");
        let mut report = work_packages::run_content(
            &sources,
            &resolver,
            &skeleton_mapping,
            self.shared.provenance.evaluator(),
            &self.shared.remote_temp_dir,
            self.shared.batch_size,
            self.shared.timeout,
            &content_checkpoint,
        )
        .await?;

        let mut journal_inputs = Vec::new();
        for source in &sources {
            let Some(origin_key) = &source.origin_key else { continue };
            let Some(wp_id) = skeleton_mapping.get(origin_key) else { continue };
            let author_id = source
                .payload
                .get("fields")
                .and_then(|f| f.get("reporter"))
                .and_then(|r| r.get("name"))
                .and_then(|v| v.as_str())
                .and_then(|login| resolver.resolve(SourceEntityKind::User, &JiraKey::new(login)));
            // rule 2 (§4.6.4): the creation state is the work package's
            // actual attribute set right after Phase 1 + Phase 2, not an
            // empty map — re-derive it by re-running the same pure mappers
            // Phase 1/Phase 2 already used to create/fill it.
            let mut creation_state = BTreeMap::new();
            if let Ok(skeleton) = wp_sanitize::map_skeleton(source, &self.shared.base_url, &resolver) {
                creation_state.extend(skeleton.attributes);
            }
            if let Ok(content) = wp_sanitize::map_content(source, &resolver) {
                creation_state.extend(content.attributes);
            }

            journal_inputs.push(JournalInput {
                jira_key: origin_key.clone(),
                wp_id,
                creation_state,
                // no per-work-package custom field value mapper exists yet
                // (only `custom_fields` migrates the field definitions), so
                // there is nothing to seed here.
                creation_cf_state: BTreeMap::new(),
                wp_author_id: author_id,
                raw_operations: extract_raw_operations(source, &resolver),
            });
        }

        if !journal_inputs.is_empty() {
            let journal_report = work_packages::replay_journals(
                journal_inputs,
                self.system_deleted_user_id,
                self.shared.provenance.evaluator(),
                &self.shared.remote_temp_dir,
                self.shared.timeout,
            )
            .await?;
            report.merge(journal_report);
        }

        Ok(report)
    }
}

pub fn work_packages_content_task(shared: Arc<Shared>, system_deleted_user_id: i64) -> WorkPackagesContentTask {
    WorkPackagesContentTask {
        shared,
        system_deleted_user_id,
    }
}

/// Reconstructs each changelog entry (`changelog.histories[]`) and comment
/// (`fields.comment.comments[]`) into a [`RawOperation`] (§4.6.4). Field
/// changes outside the mapped set are preserved as unmapped notes (rule 2,
/// §8 S5) rather than dropped.
fn extract_raw_operations(source: &SourceRecord, resolver: &LinkResolver) -> Vec<RawOperation> {
    let mut ops = Vec::new();
    let histories = source.payload.get("changelog").and_then(|c| c.get("histories")).and_then(|h| h.as_array());
    if let Some(histories) = histories {
        for history in histories {
            let timestamp = history
                .get("created")
                .and_then(|v| v.as_str())
                .and_then(parse_jira_timestamp)
                .unwrap_or_else(Utc::now);
            let author_login = history.get("author").and_then(|a| a.get("name")).and_then(|v| v.as_str());
            let user_id = author_login.and_then(|login| resolver.resolve(SourceEntityKind::User, &JiraKey::new(login)));

            let mut field_changes = BTreeMap::new();
            let mut unmapped_notes = Vec::new();
            let items = history.get("items").and_then(|v| v.as_array()).cloned().unwrap_or_default();
            for item in &items {
                let field = item.get("field").and_then(|v| v.as_str()).unwrap_or("field");
                let from = item.get("fromString").and_then(|v| v.as_str()).unwrap_or("");
                let to = item.get("toString").and_then(|v| v.as_str()).unwrap_or("");
                if mapped_field(field) {
                    field_changes.insert(
                        field.to_string(),
                        model::FieldChange {
                            field: field.to_string(),
                            from: Some(Value::String(from.to_string())),
                            to: Some(Value::String(to.to_string())),
                        },
                    );
                } else {
                    unmapped_notes.push(format!("Jira: {field} changed from '{from}' to '{to}'"));
                }
            }

            ops.push(RawOperation {
                kind: OperationKind::Change,
                user_id,
                timestamp,
                notes: String::new(),
                field_changes,
                unmapped_notes: if unmapped_notes.is_empty() { None } else { Some(unmapped_notes.join("; ")) },
            });
        }
    }

    if let Some(comments) = source.payload.get("fields").and_then(|f| f.get("comment")).and_then(|c| c.get("comments")).and_then(|v| v.as_array()) {
        for comment in comments {
            let timestamp = comment.get("created").and_then(|v| v.as_str()).and_then(parse_jira_timestamp).unwrap_or_else(Utc::now);
            let author_login = comment.get("author").and_then(|a| a.get("name")).and_then(|v| v.as_str());
            let user_id = author_login.and_then(|login| resolver.resolve(SourceEntityKind::User, &JiraKey::new(login)));
            let body = comment.get("body").and_then(|v| v.as_str()).unwrap_or("").to_string();
            ops.push(RawOperation {
                kind: OperationKind::Comment,
                user_id,
                timestamp,
                notes: body,
                field_changes: BTreeMap::new(),
                unmapped_notes: None,
            });
        }
    }

    ops
}

fn mapped_field(field: &str) -> bool {
    matches!(field, "status" | "assignee" | "priority" | "summary" | "description" | "fixVersion" | "resolution")
}

fn parse_jira_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc)).or_else(|| {
        DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z").ok().map(|dt| dt.with_timezone(&Utc))
    })
}

/// The four leaf components that rewrite or attach data onto an already
/// migrated work package (§4.6.5 "Attachments" / "Time entries" /
/// "Relations" / "Watchers" / "Remote links"). All five share the same
/// per-issue fetch-map-create shape; only the field path read out of the
/// issue payload and the mapper differ.
pub struct CrossRefTask {
    pub shared: Arc<Shared>,
    pub component: &'static str,
    pub kind: SourceEntityKind,
    pub field_path: &'static str,
    pub mapper: Arc<dyn Fn(&SourceRecord, &str, &LinkResolver) -> Result<MappedRecord, MappingError> + Send + Sync>,
}

#[async_trait]
impl ComponentTask for CrossRefTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let jql = issue_jql(&self.shared.project_keys);
        let issues = self.shared.jira.fetch_all_issues(&jql, self.shared.batch_size as u32, &[]).await?;
        let resolver = self.shared.resolver.read().await.clone();

        let mut sources = Vec::new();
        for issue in &issues {
            let issue_key = issue.get("key").and_then(|v| v.as_str()).map(str::to_string);
            let Some(issue_key) = issue_key else { continue };
            let entries = issue.get("fields").and_then(|f| f.get(self.field_path)).and_then(|v| v.as_array()).cloned().unwrap_or_default();
            for entry in entries {
                let origin_id = numeric_origin_id(&entry);
                sources.push(SourceRecord::new(self.kind, origin_id, Some(JiraKey::new(issue_key.clone())), entry));
            }
        }

        let mapper = self.mapper.clone();
        let base_url = self.shared.base_url.clone();
        let checkpoint = self.shared.checkpoint(self.component);
        run_simple_component(
            self.component,
            self.kind,
            sources,
            move |source| mapper(source, &base_url, &resolver),
            &self.shared.provenance,
            self.shared.provenance.evaluator(),
            &self.shared.remote_temp_dir,
            self.shared.batch_size,
            self.shared.timeout,
            &checkpoint,
        )
        .await
    }
}

/// §4.6.5 "Attachments": downloads each issue's attachment bytes, stages
/// them on the remote host, and creates one `Attachment` per file with the
/// original author and timestamp preserved (§9 DESIGN NOTES — the one
/// component that needs a binary side channel alongside the JSON payload).
pub struct AttachmentsTask {
    pub shared: Arc<Shared>,
    pub max_concurrent: usize,
}

#[async_trait]
impl ComponentTask for AttachmentsTask {
    async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
        let jql = issue_jql(&self.shared.project_keys);
        let issues = self.shared.jira.fetch_all_issues(&jql, self.shared.batch_size as u32, &[]).await?;
        let resolver = self.shared.resolver.read().await.clone();

        let mut sources = Vec::new();
        for issue in &issues {
            let Some(issue_key) = issue.get("key").and_then(|v| v.as_str()) else { continue };
            let attachments = issue.get("fields").and_then(|f| f.get("attachment")).and_then(|v| v.as_array()).cloned().unwrap_or_default();
            for attachment in attachments {
                let origin_id = numeric_origin_id(&attachment);
                sources.push(SourceRecord::new(SourceEntityKind::Attachment, origin_id, Some(JiraKey::new(issue_key)), attachment));
            }
        }

        let jira = self.shared.jira.clone();
        let fetch = move |content_url: &str| -> futures::future::BoxFuture<'static, Result<Vec<u8>, MigrationError>> {
            let jira = jira.clone();
            let content_url = content_url.to_string();
            Box::pin(async move { Ok(jira.download(&content_url).await?) })
        };

        let downloads = cross::download_attachments(sources, &self.shared.base_url, &resolver, self.max_concurrent, fetch).await;

        let mut report = LoadReport::default();
        let mut pending = Vec::new();
        for outcome in downloads {
            match outcome {
                Ok((mut record, bytes)) => {
                    let remote_path = format!("{}/j2o_attachment_{}.bin", self.shared.remote_temp_dir, uuid::Uuid::new_v4().simple());
                    if let Err(err) = self.shared.provenance.evaluator().transfer_file_in(&bytes, &remote_path).await {
                        report.failed += 1;
                        report.errors.push(err.to_string());
                        continue;
                    }
                    record.set("file_path", Value::String(remote_path));
                    pending.push(record);
                }
                Err(err) => {
                    report.failed += 1;
                    report.errors.push(err.to_string());
                }
            }
        }

        for batch in Batch::chunk(pending, self.shared.batch_size.max(1)) {
            let input_path = format!("{}/j2o_input_attachments_{}.json", self.shared.remote_temp_dir, batch.index);
            let result_path = format!("{}/j2o_result_attachments_{}.json", self.shared.remote_temp_dir, batch.index);
            let composed = compose_create("attachments", ScriptKind::GenericCreate, &batch.records, &input_path, &result_path)?;
            let result = self
                .shared
                .provenance
                .evaluator()
                .execute(&composed.script.full_source(), Some(&composed.input_payload), Some(&input_path), &result_path, self.shared.timeout)
                .await?;
            report.merge(migrations::report_from_result(&result));
        }
        Ok(report)
    }
}

const ATTACHMENT_MAX_CONCURRENT: usize = 4;

pub fn attachments_task(shared: Arc<Shared>) -> AttachmentsTask {
    AttachmentsTask {
        shared,
        max_concurrent: ATTACHMENT_MAX_CONCURRENT,
    }
}

pub fn time_entries_task(shared: Arc<Shared>) -> CrossRefTask {
    CrossRefTask {
        shared,
        component: "time_entries",
        kind: SourceEntityKind::Worklog,
        field_path: "worklog",
        mapper: Arc::new(|source, base_url, resolver| cross::map_time_entry(source, base_url, resolver)),
    }
}

pub fn relations_task(shared: Arc<Shared>) -> CrossRefTask {
    CrossRefTask {
        shared,
        component: "relations",
        kind: SourceEntityKind::Relation,
        field_path: "issuelinks",
        mapper: Arc::new(|source, base_url, resolver| cross::map_relation(source, base_url, resolver)),
    }
}

pub fn watchers_task(shared: Arc<Shared>) -> CrossRefTask {
    CrossRefTask {
        shared,
        component: "watchers",
        kind: SourceEntityKind::Watcher,
        field_path: "watches",
        mapper: Arc::new(|source, base_url, resolver| cross::map_watcher(source, base_url, resolver)),
    }
}

pub fn remote_links_task(shared: Arc<Shared>) -> CrossRefTask {
    CrossRefTask {
        shared,
        component: "remote_links",
        kind: SourceEntityKind::RemoteLink,
        field_path: "remotelinks",
        mapper: Arc::new(|source, base_url, resolver| cross::map_remote_link(source, base_url, resolver)),
    }
}

pub fn simple_tasks(shared: &Arc<Shared>) -> Vec<(&'static str, SimpleEntityTask)> {
    vec![
        ("users", users_task(shared.clone())),
        ("groups", groups_task(shared.clone())),
        ("custom_fields", custom_fields_task(shared.clone())),
        ("issue_types", issue_types_task(shared.clone())),
        ("statuses", statuses_task(shared.clone())),
    ]
}
