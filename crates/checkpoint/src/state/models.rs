use chrono::{DateTime, Utc};
use model::{BatchIndex, ComponentName, RunId};
use serde::{Deserialize, Serialize};

/// Durable per-component progress (§4.5). `last_completed_batch_index` is
/// the fast-forward marker a component consults before re-extracting;
/// `resume_token` is component-defined (a Jira `startAt` cursor, a paging
/// key, …) and opaque to the checkpoint store itself.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Checkpoint {
    pub run_id: RunId,
    pub component: ComponentName,
    pub stage: CheckpointStage,
    pub last_completed_batch_index: Option<BatchIndex>,
    pub resume_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Tracks whether a batch's Load has merely been attempted ("write") or has
/// committed ("committed") so a racing update for a later batch never
/// overwrites an in-flight one (§4.5, crash-safety property in §8).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointStage {
    Read,
    Write,
    Committed,
}

impl CheckpointStage {
    fn rank(self) -> u8 {
        match self {
            CheckpointStage::Read => 1,
            CheckpointStage::Write => 2,
            CheckpointStage::Committed => 3,
        }
    }
}

impl Checkpoint {
    pub fn new(run_id: RunId, component: ComponentName) -> Self {
        Self {
            run_id,
            component,
            stage: CheckpointStage::Read,
            last_completed_batch_index: None,
            resume_token: None,
            updated_at: Utc::now(),
        }
    }

    /// True once `updated_at` is within `freshness` of now — the fast-forward
    /// condition a component checks before deciding to skip completed
    /// batches (§4.5).
    pub fn is_fresh(&self, freshness: chrono::Duration) -> bool {
        Utc::now().signed_duration_since(self.updated_at) <= freshness
    }

    /// Whether `stage` is a legitimate successor to this checkpoint's
    /// current stage within the same batch (§4.5, §8 crash-safety
    /// property): a racing "read" for a batch already "write" or
    /// "committed" never regresses the stored state.
    pub fn accepts(&self, batch_index: Option<BatchIndex>, stage: CheckpointStage) -> bool {
        if batch_index == self.last_completed_batch_index {
            stage.rank() >= self.stage.rank()
        } else {
            self.stage == CheckpointStage::Committed
        }
    }
}

/// Audit-trail entries appended alongside checkpoint writes (§4.5, §7). Not
/// authoritative for resume decisions — `Checkpoint` is — but gives the
/// `ProgressService` and post-hoc diagnostics a finer-grained timeline than
/// the coarse per-component checkpoint record.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum WalEntry {
    RunStarted {
        run_id: RunId,
    },
    ComponentStarted {
        run_id: RunId,
        component: ComponentName,
    },
    BatchCommitted {
        run_id: RunId,
        component: ComponentName,
        batch_index: BatchIndex,
    },
    ComponentFinished {
        run_id: RunId,
        component: ComponentName,
        succeeded: bool,
    },
    RunFinished {
        run_id: RunId,
    },
    Heartbeat {
        run_id: RunId,
        component: ComponentName,
        at: DateTime<Utc>,
    },
}

impl WalEntry {
    pub fn run_id(&self) -> &RunId {
        match self {
            WalEntry::RunStarted { run_id } => run_id,
            WalEntry::ComponentStarted { run_id, .. } => run_id,
            WalEntry::BatchCommitted { run_id, .. } => run_id,
            WalEntry::ComponentFinished { run_id, .. } => run_id,
            WalEntry::RunFinished { run_id } => run_id,
            WalEntry::Heartbeat { run_id, .. } => run_id,
        }
    }
}

/// A cheap projection of [`Checkpoint`] for callers that only need to know
/// whether work remains, not the full resume-token payload.
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub component: ComponentName,
    pub last_completed_batch_index: Option<BatchIndex>,
    pub updated_at: DateTime<Utc>,
}

impl From<Checkpoint> for CheckpointSummary {
    fn from(cp: Checkpoint) -> Self {
        Self {
            component: cp.component,
            last_completed_batch_index: cp.last_completed_batch_index,
            updated_at: cp.updated_at,
        }
    }
}
