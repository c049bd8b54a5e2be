use crate::state::models::{Checkpoint, CheckpointStage, CheckpointSummary, WalEntry};
use async_trait::async_trait;
use model::{BatchIndex, ComponentName, RunId};
use std::error::Error;

pub mod models;
pub mod sled_store;

/// Durable per-component progress tracking (L5, §4.5). Implementations must
/// make `save_checkpoint` a single atomic write — sled's transactional
/// insert, or a tmp-file-then-rename for a plain file store — so a crash
/// never leaves a torn record.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn load_checkpoint(
        &self,
        run_id: &RunId,
        component: &ComponentName,
    ) -> Result<Option<Checkpoint>, Box<dyn Error + Send + Sync>>;

    async fn last_checkpoint(
        &self,
        run_id: &RunId,
        component: &ComponentName,
    ) -> Result<Option<CheckpointSummary>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .load_checkpoint(run_id, component)
            .await?
            .map(CheckpointSummary::from))
    }

    /// Deletes a component's checkpoint entirely, forcing a full replay on
    /// the next run (§4.5 `reset`). Operator-gated — callers must have an
    /// explicit `--reset` flag, enforced above this trait.
    async fn reset(
        &self,
        run_id: &RunId,
        component: &ComponentName,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), Box<dyn Error + Send + Sync>>;

    async fn iter_wal(&self, run_id: &RunId) -> Result<Vec<WalEntry>, Box<dyn Error + Send + Sync>>;

    /// Records that `new_index` has fully committed for `component` (§4.5
    /// batch-level fast-forward): the next run's first lookup of this
    /// component sees `last_completed_batch_index >= new_index` and can
    /// skip straight past it instead of re-extracting from batch zero.
    async fn advance(
        &self,
        run_id: &RunId,
        component: &ComponentName,
        new_index: BatchIndex,
        resume_token: Option<String>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.save_checkpoint(&Checkpoint {
            run_id: run_id.clone(),
            component: component.clone(),
            stage: CheckpointStage::Committed,
            last_completed_batch_index: Some(new_index),
            resume_token,
            updated_at: chrono::Utc::now(),
        })
        .await
    }
}
