use crate::core::identifiers::{BatchIndex, ComponentName, RunId};
use crate::events::Event;
use chrono::{DateTime, Utc};

/// Emitted when the orchestrator begins a component (§4.7).
#[derive(Debug, Clone)]
pub struct ComponentStarted {
    pub run_id: RunId,
    pub component: ComponentName,
    pub timestamp: DateTime<Utc>,
}

impl Event for ComponentStarted {
    fn event_type(&self) -> &'static str {
        "component.started"
    }
}

/// Emitted after a single batch's Load step has been checkpointed (§4.7).
#[derive(Debug, Clone)]
pub struct BatchCompleted {
    pub run_id: RunId,
    pub component: ComponentName,
    pub batch_index: BatchIndex,
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    pub timestamp: DateTime<Utc>,
}

impl Event for BatchCompleted {
    fn event_type(&self) -> &'static str {
        "batch.completed"
    }
}

/// Emitted when a component's Extract/Map/Load cycle finishes, successfully
/// or not (§4.7).
#[derive(Debug, Clone)]
pub struct ComponentFinished {
    pub run_id: RunId,
    pub component: ComponentName,
    pub succeeded: bool,
    pub total_created: u64,
    pub total_skipped: u64,
    pub total_failed: u64,
    pub timestamp: DateTime<Utc>,
}

impl Event for ComponentFinished {
    fn event_type(&self) -> &'static str {
        "component.finished"
    }
}

/// Emitted for any error surfaced to the error channel (§7): mapping
/// errors, evaluator errors, and other non-fatal per-record failures that
/// don't halt the component.
#[derive(Debug, Clone)]
pub struct ComponentError {
    pub run_id: RunId,
    pub component: ComponentName,
    pub kind: ErrorKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Evaluator,
    Mapping,
    Configuration,
}

impl Event for ComponentError {
    fn event_type(&self) -> &'static str {
        "component.error"
    }
}

/// Emitted when a graceful shutdown is requested (SIGINT/SIGTERM, §5).
#[derive(Debug, Clone)]
pub struct ShutdownRequested {
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl Event for ShutdownRequested {
    fn event_type(&self) -> &'static str {
        "system.shutdown_requested"
    }
}
