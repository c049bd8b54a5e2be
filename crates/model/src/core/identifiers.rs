use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(Arc::from(id.into()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

/// Identifies one orchestrator invocation end to end; shared by checkpoints,
/// WAL entries, and progress events.
string_id!(RunId);

/// Name of a component in the dependency graph (`"users"`, `"work_packages_skeleton"`, …).
string_id!(ComponentName);

/// A Jira issue/entity business key, e.g. `"NRS-182"`. Distinct from the
/// numeric Jira id: components key caches and provenance lookups by this.
string_id!(JiraKey);

/// Jira's numeric id for an entity (stable across renames; `JiraKey` is not).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginId(pub i64);

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a batch within a single component's Load phase. Monotone within
/// a component; used by the checkpoint store for fast-forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchIndex(pub u64);

impl fmt::Display for BatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BatchIndex {
    pub fn next(self) -> Self {
        BatchIndex(self.0 + 1)
    }
}
