use crate::{
    error::ProgressError,
    state::{StateStore, models::WalEntry},
};
use chrono::DateTime;
use model::{BatchIndex, ComponentName, RunId};
use serde::Serialize;
use std::{fmt, sync::Arc};

/// Read-only status reporting over the checkpoint store (§0.5), queried by
/// the CLI's `progress` subcommand and surfaced in `component_finished`
/// event payloads. Never writes — all state transitions go through
/// `StateStore::save_checkpoint`/`append_wal` directly from the component
/// that owns them.
#[derive(Clone)]
pub struct ProgressService {
    pub store: Arc<dyn StateStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    Idle,
    Running,
    Done,
    Failed,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "idle",
            ProgressStage::Running => "running",
            ProgressStage::Done => "done",
            ProgressStage::Failed => "failed",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStatus {
    pub stage: ProgressStage,
    pub last_completed_batch_index: Option<BatchIndex>,
    pub last_heartbeat: Option<DateTime<chrono::Utc>>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        ProgressService { store }
    }

    pub async fn component_status(
        &self,
        run_id: &RunId,
        component: &ComponentName,
    ) -> Result<ProgressStatus, ProgressError> {
        let wal_entries = self
            .store
            .iter_wal(run_id)
            .await
            .map_err(|e| ProgressError::Wal(e.to_string()))?;

        let mut started = false;
        let mut finished = false;
        let mut failed = false;
        let mut last_heartbeat = None;

        for entry in &wal_entries {
            match entry {
                WalEntry::ComponentStarted { component: c, .. } if c == component => {
                    started = true;
                }
                WalEntry::Heartbeat {
                    component: c, at, ..
                } if c == component => {
                    last_heartbeat = Some(*at);
                }
                WalEntry::ComponentFinished {
                    component: c,
                    succeeded,
                    ..
                } if c == component => {
                    finished = true;
                    failed = !succeeded;
                }
                _ => {}
            }
        }

        let checkpoint = self
            .store
            .load_checkpoint(run_id, component)
            .await
            .map_err(|err| ProgressError::LoadCheckpoint(err.to_string()))?;

        let last_completed_batch_index =
            checkpoint.and_then(|cp| cp.last_completed_batch_index);

        let stage = if failed {
            ProgressStage::Failed
        } else if finished {
            ProgressStage::Done
        } else if started {
            ProgressStage::Running
        } else {
            ProgressStage::Idle
        };

        Ok(ProgressStatus {
            stage,
            last_completed_batch_index,
            last_heartbeat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::models::{Checkpoint, CheckpointStage};
    use crate::state::sled_store::SledStateStore;
    use tempfile::tempdir;

    fn run_id() -> RunId {
        RunId::new("test-run")
    }

    fn component() -> ComponentName {
        ComponentName::new("issues")
    }

    #[tokio::test]
    async fn reports_running_stage_with_checkpoint() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn StateStore> =
            Arc::new(SledStateStore::open(dir.path()).expect("open sled"));
        let service = ProgressService::new(store.clone());

        store
            .append_wal(&WalEntry::ComponentStarted {
                run_id: run_id(),
                component: component(),
            })
            .await
            .unwrap();
        store
            .append_wal(&WalEntry::Heartbeat {
                run_id: run_id(),
                component: component(),
                at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        store
            .save_checkpoint(&Checkpoint {
                run_id: run_id(),
                component: component(),
                stage: CheckpointStage::Committed,
                last_completed_batch_index: Some(BatchIndex(2)),
                resume_token: None,
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let status = service.component_status(&run_id(), &component()).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Running);
        assert_eq!(status.last_completed_batch_index, Some(BatchIndex(2)));
        assert!(status.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn reports_done_stage_when_component_finished() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn StateStore> =
            Arc::new(SledStateStore::open(dir.path()).expect("open sled"));
        let service = ProgressService::new(store.clone());

        store
            .append_wal(&WalEntry::ComponentFinished {
                run_id: run_id(),
                component: component(),
                succeeded: true,
            })
            .await
            .unwrap();

        let status = service.component_status(&run_id(), &component()).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Done);
    }

    #[tokio::test]
    async fn reports_failed_stage_when_component_errors_out() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn StateStore> =
            Arc::new(SledStateStore::open(dir.path()).expect("open sled"));
        let service = ProgressService::new(store.clone());

        store
            .append_wal(&WalEntry::ComponentFinished {
                run_id: run_id(),
                component: component(),
                succeeded: false,
            })
            .await
            .unwrap();

        let status = service.component_status(&run_id(), &component()).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Failed);
    }
}
