pub mod error;
pub mod event_bus;
pub mod metrics;
pub mod progress;
pub mod retry;
pub mod state;

pub use error::{CheckpointError, ProgressError};
pub use event_bus::EventBus;
pub use metrics::{Metrics, MetricsSnapshot};
pub use progress::{ProgressService, ProgressStage, ProgressStatus};
pub use retry::{BackoffStrategy, RetryConfig, RetryDisposition, RetryError, RetryPolicy};
pub use state::{
    StateStore,
    models::{Checkpoint, CheckpointStage, CheckpointSummary, WalEntry},
    sled_store::SledStateStore,
};
