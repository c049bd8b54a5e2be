use crate::error::MigrationError;
use checkpoint::StateStore;
use model::{BatchIndex, ComponentName, MappedRecord, RemoteResultStatus, RunId, SourceEntityKind};

/// Aggregated outcome of one component's Load phase (§4.6.1, §7). The
/// orchestrator's `component_finished` event is built directly from this.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

impl LoadReport {
    pub fn merge(&mut self, other: LoadReport) {
        self.created += other.created;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Classifies a just-returned [`model::RemoteResult`] into a [`LoadReport`],
/// the shared last step of every component's Load (§4.6.1).
pub fn report_from_result(result: &model::RemoteResult) -> LoadReport {
    let mut report = LoadReport::default();
    for row in &result.results {
        match &row.error {
            Some(message) => {
                report.failed += 1;
                report.errors.push(format!("{}: {message}", row.jira_key.as_deref().unwrap_or("?")));
            }
            None => report.created += 1,
        }
    }
    report.failed += match result.status {
        RemoteResultStatus::Failed if result.results.is_empty() => 1,
        _ => 0,
    };
    report
}

/// The entity kind a component's extracted [`model::SourceRecord`]s carry,
/// resolved from the component name used throughout the dependency graph
/// and provenance lookups.
pub fn entity_kind_for(component: &str) -> Option<SourceEntityKind> {
    let kind = match component {
        "users" => SourceEntityKind::User,
        "groups" => SourceEntityKind::Group,
        "projects" => SourceEntityKind::Project,
        "custom_fields" => SourceEntityKind::CustomField,
        "issue_types" => SourceEntityKind::IssueType,
        "statuses" => SourceEntityKind::Status,
        "workflows" => SourceEntityKind::Workflow,
        "priorities" => SourceEntityKind::Priority,
        "versions" => SourceEntityKind::Version,
        "components" => SourceEntityKind::Component,
        "labels" => SourceEntityKind::Label,
        "work_packages_skeleton" | "work_packages_content" => SourceEntityKind::Issue,
        "attachments" => SourceEntityKind::Attachment,
        "time_entries" => SourceEntityKind::Worklog,
        "relations" => SourceEntityKind::Relation,
        "watchers" => SourceEntityKind::Watcher,
        "remote_links" => SourceEntityKind::RemoteLink,
        _ => return None,
    };
    Some(kind)
}

/// Transformation-only components refuse to run without a pre-existing
/// work-package mapping (§9 open question, resolved `true` by default —
/// see DESIGN.md).
pub fn requires_work_package_mapping(component: &str) -> bool {
    matches!(component, "attachments" | "labels" | "versions" | "time_entries" | "relations" | "watchers" | "remote_links")
}

/// A component's handle onto its own batch-level fast-forward state (§4.5).
/// `component` is the checkpoint key a caller chooses — distinct from the
/// dependency-graph component name whenever the same task name is reused
/// across an inner loop (e.g. `ProjectScopedTask` qualifies it per project).
pub struct BatchCheckpoint<'a> {
    store: &'a dyn StateStore,
    run_id: &'a RunId,
    component: ComponentName,
}

impl<'a> BatchCheckpoint<'a> {
    pub fn new(store: &'a dyn StateStore, run_id: &'a RunId, component: impl Into<String>) -> Self {
        Self {
            store,
            run_id,
            component: ComponentName::new(component.into()),
        }
    }

    /// The batch index to resume from: one past whatever last fully
    /// committed in a prior invocation of this `run_id`, or zero if nothing
    /// has ever committed.
    pub async fn start_index(&self) -> Result<u64, MigrationError> {
        let last = self
            .store
            .last_checkpoint(self.run_id, &self.component)
            .await
            .map_err(|err| MigrationError::Checkpoint(err.to_string()))?;
        Ok(last.and_then(|s| s.last_completed_batch_index).map(|idx| idx.next().0).unwrap_or(0))
    }

    /// Records `index` as fully committed, so a restarted run skips every
    /// batch up to and including it.
    pub async fn advance(&self, index: BatchIndex) -> Result<(), MigrationError> {
        self.store
            .advance(self.run_id, &self.component, index, None)
            .await
            .map_err(|err| MigrationError::Checkpoint(err.to_string()))
    }
}

/// True for `MappedRecord`s whose attribute keys and values satisfy the
/// sanitizer-purity property (§8 #2): no key starting with `_`, no nested
/// link-object value.
pub fn is_pure_record(record: &MappedRecord) -> bool {
    record.is_pure()
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint::SledStateStore;

    #[test]
    fn attachments_require_a_work_package_mapping_by_default() {
        assert!(requires_work_package_mapping("attachments"));
        assert!(!requires_work_package_mapping("users"));
    }

    #[test]
    fn unknown_component_has_no_entity_kind() {
        assert!(entity_kind_for("not_a_component").is_none());
    }

    #[tokio::test]
    async fn start_index_is_zero_with_no_prior_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        let run_id = RunId::new("run-bc-1");
        let checkpoint = BatchCheckpoint::new(&store, &run_id, "users");

        assert_eq!(checkpoint.start_index().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn advancing_past_a_batch_resumes_one_past_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        let run_id = RunId::new("run-bc-2");
        let checkpoint = BatchCheckpoint::new(&store, &run_id, "users");

        checkpoint.advance(BatchIndex(3)).await.unwrap();

        assert_eq!(checkpoint.start_index().await.unwrap(), 4);
    }
}
