use crate::core::identifiers::JiraKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `{origin_key → target_id}`, stored in a local file (§3.1). Explicitly
/// **non-authoritative**: the provenance store is always consulted first;
/// this cache exists purely to avoid re-querying OpenProject for every
/// lookup and may be deleted and rebuilt at any time from `ProvenanceTag`s
/// via `build_mapping_cache` (§4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingCache {
    pub entries: HashMap<JiraKey, i64>,
}

impl MappingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &JiraKey) -> Option<i64> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: JiraKey, target_id: i64) {
        self.entries.insert(key, target_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
