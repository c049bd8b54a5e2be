pub mod progress;

use std::fmt::Debug;

/// A trait for events that can be published on the orchestrator's event bus.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}
