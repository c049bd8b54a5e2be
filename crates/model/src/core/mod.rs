pub mod identifiers;
pub mod value;

pub use identifiers::{BatchIndex, ComponentName, JiraKey, OriginId, RunId};
pub use value::Value;
