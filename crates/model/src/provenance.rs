use crate::core::identifiers::{JiraKey, OriginId};
use serde::{Deserialize, Serialize};

/// The four provenance custom-field names OpenProject carries on every
/// migrated entity (§6, "Wire formats"). These are load-bearing string
/// constants — the Rails scripts interpolate them verbatim and
/// `find_by_provenance` joins on them, so they are centralized here rather
/// than re-typed at each call site.
pub const CF_ORIGIN_SYSTEM: &str = "J2O Origin System";
pub const CF_ORIGIN_ID: &str = "J2O Origin ID";
pub const CF_ORIGIN_KEY: &str = "J2O Origin Key";
pub const CF_ORIGIN_URL: &str = "J2O Origin URL";

/// The origin system tag written into every provenance-tagged entity.
/// Always `"jira"` today; kept as a type (not a literal) so a second source
/// system could be added without touching every call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginSystem {
    Jira,
}

impl OriginSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginSystem::Jira => "jira",
        }
    }
}

/// `{origin_system, origin_id, origin_key, origin_url}` — the authoritative
/// record of Jira→OpenProject identity (§3.1). Written as custom-field
/// values on every migrated entity before the Load transaction commits
/// (invariant 1); never rewritten once created (§3.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceTag {
    pub origin_system: OriginSystem,
    pub origin_id: OriginId,
    pub origin_key: JiraKey,
    pub origin_url: String,
}

impl ProvenanceTag {
    pub fn jira(origin_id: OriginId, origin_key: JiraKey, origin_url: impl Into<String>) -> Self {
        Self {
            origin_system: OriginSystem::Jira,
            origin_id,
            origin_key,
            origin_url: origin_url.into(),
        }
    }

    /// The four custom-field assignments the sanitizer attaches to every
    /// `MappedRecord` (§4.3 rule 6).
    pub fn as_custom_field_pairs(&self) -> [(&'static str, String); 4] {
        [
            (CF_ORIGIN_SYSTEM, self.origin_system.as_str().to_string()),
            (CF_ORIGIN_ID, self.origin_id.to_string()),
            (CF_ORIGIN_KEY, self.origin_key.to_string()),
            (CF_ORIGIN_URL, self.origin_url.clone()),
        ]
    }
}
