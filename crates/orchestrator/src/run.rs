use crate::error::OrchestratorError;
use crate::options::RunOptions;
use crate::task::ComponentTask;
use checkpoint::{Checkpoint, CheckpointStage, EventBus, StateStore, WalEntry};
use migrations::dependency_graph::resolve_order;
use model::events::progress::{ComponentError, ComponentFinished, ComponentStarted, ErrorKind};
use model::{ComponentName, RunId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-component outcome, aggregated into a `RunSummary` (§7: "a structured
/// summary at stdout, a JSON results file under `results/`").
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComponentOutcome {
    pub component: String,
    pub succeeded: bool,
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub outcomes: Vec<ComponentOutcome>,
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        !self.stopped_early && self.outcomes.iter().all(|o| o.succeeded)
    }
}

/// Sequences `ComponentTask`s in dependency order (§4.6.2, §4.7), respecting
/// the checkpoint store's per-component completion state, emitting progress
/// events, and honoring a `CancellationToken` for graceful shutdown (§5).
///
/// Concurrency within a component — the "bounded worker pool" of §4.7 — is
/// each `ComponentTask` impl's own concern; the orchestrator only guarantees
/// components run one at a time and in topological order, matching "the next
/// component starts only after the previous one's checkpoint shows
/// completion" (§5).
pub struct Orchestrator {
    event_bus: EventBus,
    state_store: Arc<dyn StateStore>,
}

impl Orchestrator {
    pub fn new(event_bus: EventBus, state_store: Arc<dyn StateStore>) -> Self {
        Self {
            event_bus,
            state_store,
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Runs every component named in `options` (or the full default graph)
    /// through its registered `ComponentTask`. A component with no entry in
    /// `tasks` is skipped — callers register only the components they're
    /// prepared to extract from, so a partially-wired orchestrator (e.g.
    /// before `jira-client` covers every entity) degrades gracefully rather
    /// than failing at startup.
    pub async fn run(
        &self,
        options: &RunOptions,
        tasks: &HashMap<String, Box<dyn ComponentTask>>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, OrchestratorError> {
        let override_order = options.component_order.as_deref();
        let only = options.components.as_deref();
        let order = resolve_order(override_order, only);

        if let Some(only) = only {
            for name in only {
                if !order.iter().any(|c| c == name) {
                    return Err(OrchestratorError::UnknownComponent(name.clone()));
                }
            }
        }

        for component in &options.reset_components {
            self.state_store
                .reset(&options.run_id, &ComponentName::new(component.as_str()))
                .await
                .map_err(|e| OrchestratorError::Checkpoint(e.to_string()))?;
        }

        self.append_wal(WalEntry::RunStarted {
            run_id: options.run_id.clone(),
        })
        .await?;

        let mut outcomes = Vec::with_capacity(order.len());
        let mut stopped_early = false;

        for component in &order {
            if cancel.is_cancelled() {
                info!(component = %component, "shutdown requested, not starting further components");
                stopped_early = true;
                break;
            }

            let Some(task) = tasks.get(component) else {
                info!(component = %component, "no task registered for component, skipping");
                continue;
            };

            let name = ComponentName::new(component.as_str());

            // §4.5 fast-forward: a component whose checkpoint already shows
            // `Committed` with no dangling batch index finished cleanly in a
            // prior invocation of this same `run_id` — don't redo it. A
            // `Committed` checkpoint that still names a batch index means
            // the component crashed mid-run; it still needs to run so its
            // own `BatchCheckpoint` can skip the batches already done.
            let already_done = self
                .state_store
                .load_checkpoint(&options.run_id, &name)
                .await
                .map_err(|e| OrchestratorError::Checkpoint(e.to_string()))?
                .map(|cp| cp.stage == CheckpointStage::Committed && cp.last_completed_batch_index.is_none())
                .unwrap_or(false);

            if already_done {
                info!(component = %component, run_id = %options.run_id, "component already committed in a prior run, skipping");
                outcomes.push(ComponentOutcome {
                    component: component.clone(),
                    succeeded: true,
                    created: 0,
                    skipped: 0,
                    failed: 0,
                    errors: Vec::new(),
                });
                continue;
            }

            self.start_component(&options.run_id, &name).await?;

            match task.run(cancel).await {
                Ok(report) => {
                    let succeeded = report.succeeded();
                    self.finish_component(&options.run_id, &name, succeeded, &report)
                        .await?;
                    if !succeeded {
                        for message in &report.errors {
                            self.publish_error(&options.run_id, &name, ErrorKind::Mapping, message)
                                .await;
                        }
                    }
                    outcomes.push(ComponentOutcome {
                        component: component.clone(),
                        succeeded,
                        created: report.created,
                        skipped: report.skipped,
                        failed: report.failed,
                        errors: report.errors,
                    });
                    if !succeeded && !options.continue_on_error {
                        stopped_early = true;
                        break;
                    }
                }
                Err(err) => {
                    warn!(component = %component, error = %err, "component failed fatally");
                    self.publish_error(&options.run_id, &name, classify(&err), &err.to_string())
                        .await;
                    self.finish_component_failed(&options.run_id, &name).await?;
                    outcomes.push(ComponentOutcome {
                        component: component.clone(),
                        succeeded: false,
                        created: 0,
                        skipped: 0,
                        failed: 0,
                        errors: vec![err.to_string()],
                    });
                    if !options.continue_on_error {
                        stopped_early = true;
                        break;
                    }
                }
            }
        }

        self.append_wal(WalEntry::RunFinished {
            run_id: options.run_id.clone(),
        })
        .await?;

        Ok(RunSummary {
            run_id: options.run_id.to_string(),
            outcomes,
            stopped_early,
        })
    }

    async fn start_component(&self, run_id: &RunId, component: &ComponentName) -> Result<(), OrchestratorError> {
        self.append_wal(WalEntry::ComponentStarted {
            run_id: run_id.clone(),
            component: component.clone(),
        })
        .await?;
        self.event_bus
            .publish(ComponentStarted {
                run_id: run_id.clone(),
                component: component.clone(),
                timestamp: now(),
            })
            .await;
        Ok(())
    }

    async fn finish_component(
        &self,
        run_id: &RunId,
        component: &ComponentName,
        succeeded: bool,
        report: &migrations::LoadReport,
    ) -> Result<(), OrchestratorError> {
        self.append_wal(WalEntry::ComponentFinished {
            run_id: run_id.clone(),
            component: component.clone(),
            succeeded,
        })
        .await?;
        self.state_store
            .save_checkpoint(&Checkpoint {
                run_id: run_id.clone(),
                component: component.clone(),
                stage: CheckpointStage::Committed,
                last_completed_batch_index: None,
                resume_token: None,
                updated_at: now(),
            })
            .await
            .map_err(|e| OrchestratorError::Checkpoint(e.to_string()))?;
        self.event_bus
            .publish(ComponentFinished {
                run_id: run_id.clone(),
                component: component.clone(),
                succeeded,
                total_created: report.created,
                total_skipped: report.skipped,
                total_failed: report.failed,
                timestamp: now(),
            })
            .await;
        Ok(())
    }

    async fn finish_component_failed(&self, run_id: &RunId, component: &ComponentName) -> Result<(), OrchestratorError> {
        self.append_wal(WalEntry::ComponentFinished {
            run_id: run_id.clone(),
            component: component.clone(),
            succeeded: false,
        })
        .await?;
        self.event_bus
            .publish(ComponentFinished {
                run_id: run_id.clone(),
                component: component.clone(),
                succeeded: false,
                total_created: 0,
                total_skipped: 0,
                total_failed: 0,
                timestamp: now(),
            })
            .await;
        Ok(())
    }

    async fn publish_error(&self, run_id: &RunId, component: &ComponentName, kind: ErrorKind, message: &str) {
        self.event_bus
            .publish(ComponentError {
                run_id: run_id.clone(),
                component: component.clone(),
                kind,
                message: message.to_string(),
                timestamp: now(),
            })
            .await;
    }

    async fn append_wal(&self, entry: WalEntry) -> Result<(), OrchestratorError> {
        self.state_store
            .append_wal(&entry)
            .await
            .map_err(|e| OrchestratorError::Checkpoint(e.to_string()))
    }
}

fn classify(err: &migrations::MigrationError) -> ErrorKind {
    use migrations::MigrationError as E;
    match err {
        E::Evaluate(_) => ErrorKind::Transport,
        E::Extract(_) => ErrorKind::Transport,
        E::Compose(_) => ErrorKind::Protocol,
        E::Provenance(_) => ErrorKind::Evaluator,
        E::Mapping(_) => ErrorKind::Mapping,
        E::MissingWorkPackageMapping(_) | E::UnknownComponent(_) => ErrorKind::Configuration,
        E::Checkpoint(_) | E::TaskJoin(_) => ErrorKind::Protocol,
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint::SledStateStore;
    use migrations::{LoadReport, MigrationError};
    use tempfile::tempdir;

    struct FixedOutcome {
        report: Result<LoadReport, MigrationError>,
    }

    #[async_trait::async_trait]
    impl ComponentTask for FixedOutcome {
        async fn run(&self, _cancel: &CancellationToken) -> Result<LoadReport, MigrationError> {
            match &self.report {
                Ok(report) => Ok(report.clone()),
                Err(_) => Err(MigrationError::UnknownComponent("boom".to_string())),
            }
        }
    }

    fn ok_task(created: u64) -> Box<dyn ComponentTask> {
        Box::new(FixedOutcome {
            report: Ok(LoadReport {
                created,
                skipped: 0,
                failed: 0,
                errors: Vec::new(),
            }),
        })
    }

    fn failing_task() -> Box<dyn ComponentTask> {
        Box::new(FixedOutcome {
            report: Err(MigrationError::UnknownComponent("boom".to_string())),
        })
    }

    async fn orchestrator() -> (Orchestrator, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store: Arc<dyn StateStore> = Arc::new(SledStateStore::open(dir.path()).expect("open sled"));
        (Orchestrator::new(EventBus::new(), store), dir)
    }

    #[tokio::test]
    async fn runs_registered_components_in_order_and_skips_unregistered_ones() {
        let (orch, _dir) = orchestrator().await;
        let mut tasks: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();
        tasks.insert("users".to_string(), ok_task(3));
        tasks.insert("projects".to_string(), ok_task(1));

        let options = RunOptions::new(RunId::new("run-1"));
        let cancel = CancellationToken::new();
        let summary = orch.run(&options, &tasks, &cancel).await.unwrap();

        assert!(summary.succeeded());
        let names: Vec<_> = summary.outcomes.iter().map(|o| o.component.as_str()).collect();
        assert_eq!(names, vec!["users", "projects"]);
    }

    #[tokio::test]
    async fn a_fatal_component_error_stops_the_run_by_default() {
        let (orch, _dir) = orchestrator().await;
        let mut tasks: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();
        tasks.insert("users".to_string(), failing_task());
        tasks.insert("groups".to_string(), ok_task(1));

        let options = RunOptions::new(RunId::new("run-2"));
        let cancel = CancellationToken::new();
        let summary = orch.run(&options, &tasks, &cancel).await.unwrap();

        assert!(!summary.succeeded());
        assert_eq!(summary.outcomes.len(), 1);
        assert_eq!(summary.outcomes[0].component, "users");
    }

    #[tokio::test]
    async fn continue_on_error_runs_every_registered_component_regardless_of_failures() {
        let (orch, _dir) = orchestrator().await;
        let mut tasks: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();
        tasks.insert("users".to_string(), failing_task());
        tasks.insert("groups".to_string(), ok_task(1));

        let mut options = RunOptions::new(RunId::new("run-3"));
        options.continue_on_error = true;
        let cancel = CancellationToken::new();
        let summary = orch.run(&options, &tasks, &cancel).await.unwrap();

        assert!(!summary.succeeded());
        assert_eq!(summary.outcomes.len(), 2);
    }

    #[tokio::test]
    async fn an_already_cancelled_token_stops_before_the_first_component_starts() {
        let (orch, _dir) = orchestrator().await;
        let mut tasks: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();
        tasks.insert("users".to_string(), ok_task(1));

        let options = RunOptions::new(RunId::new("run-4"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = orch.run(&options, &tasks, &cancel).await.unwrap();

        assert!(summary.stopped_early);
        assert!(summary.outcomes.is_empty());
    }

    #[tokio::test]
    async fn a_component_already_committed_in_a_prior_run_is_skipped_not_redone() {
        let (orch, _dir) = orchestrator().await;
        let mut tasks: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();
        tasks.insert("users".to_string(), ok_task(3));
        tasks.insert("groups".to_string(), ok_task(1));

        let options = RunOptions::new(RunId::new("run-6"));
        let cancel = CancellationToken::new();
        orch.run(&options, &tasks, &cancel).await.unwrap();

        // Same run_id, same tasks, second invocation: both components should
        // fast-forward past re-execution since their checkpoints already
        // show Committed with no dangling batch index.
        let mut tasks2: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();
        tasks2.insert("users".to_string(), failing_task());
        tasks2.insert("groups".to_string(), failing_task());
        let summary = orch.run(&options, &tasks2, &cancel).await.unwrap();

        assert!(summary.succeeded());
        assert_eq!(summary.outcomes.len(), 2);
        assert!(summary.outcomes.iter().all(|o| o.succeeded));
    }

    #[tokio::test]
    async fn an_unknown_name_in_the_components_filter_is_rejected() {
        let (orch, _dir) = orchestrator().await;
        let tasks: HashMap<String, Box<dyn ComponentTask>> = HashMap::new();

        let mut options = RunOptions::new(RunId::new("run-5"));
        options.components = Some(vec!["not_a_real_component".to_string()]);
        let cancel = CancellationToken::new();
        let result = orch.run(&options, &tasks, &cancel).await;

        assert!(matches!(result, Err(OrchestratorError::UnknownComponent(_))));
    }
}
