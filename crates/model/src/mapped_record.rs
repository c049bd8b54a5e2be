use crate::core::value::Value;
use crate::provenance::ProvenanceTag;
use crate::source_record::SourceEntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sanitized target attribute map ready for ActiveRecord instantiation
/// (§3.1). Keys are OpenProject attribute names; values are primitives or
/// foreign-key ids. By construction (the sanitizer is the only producer)
/// this never contains a link object or an API envelope key — see the
/// sanitizer-purity property in §8.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappedRecord {
    pub kind: SourceEntityKind,
    pub attributes: BTreeMap<String, Value>,
    pub provenance: ProvenanceTag,
}

impl MappedRecord {
    pub fn new(kind: SourceEntityKind, provenance: ProvenanceTag) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            provenance,
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Keys beginning with `_` or holding a nested link object never make it
    /// this far (the sanitizer rejects them before a `MappedRecord` exists);
    /// this is the runtime check the sanitizer-purity test asserts against.
    pub fn is_pure(&self) -> bool {
        self.attributes.keys().all(|k| !k.starts_with('_'))
            && self
                .attributes
                .values()
                .all(|v| !matches!(v, Value::Json(j) if j.get("href").is_some()))
    }
}
