use async_trait::async_trait;
use migrations::{LoadReport, MigrationError};
use tokio_util::sync::CancellationToken;

/// One component's Extract-Map-Load cycle (§4.6.1), supplied by the caller
/// that owns the Jira-side extraction for that component. The orchestrator
/// only knows how to sequence, checkpoint, and report on these — it has no
/// notion of what a "user" or "work package" extraction looks like.
///
/// `cancel` is checked between batches, not mid-batch (§5: a SIGINT "stops
/// dispatching new batches, waits for in-flight... then persists the current
/// checkpoint") — implementations should poll it at batch boundaries rather
/// than abort a batch already in flight.
#[async_trait]
pub trait ComponentTask: Send + Sync {
    async fn run(&self, cancel: &CancellationToken) -> Result<LoadReport, MigrationError>;
}
