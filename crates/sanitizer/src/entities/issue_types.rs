use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::{optional_bool, str_field};
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "issue_type";

/// Jira issue types are identified by numeric id, not a business key — the
/// origin key used here (and by every link that resolves against it) is
/// that id rendered as a string.
pub fn map(source: &SourceRecord, base_url: &str) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .unwrap_or_else(|| source.origin_id.to_string().into());
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;
    let is_subtask = optional_bool(&source.payload, "subtask").unwrap_or(false);

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/rest/api/2/issuetype/{}", source.origin_id),
    );
    let mut record = MappedRecord::new(SourceEntityKind::IssueType, provenance);
    record.set("name", Value::String(name.to_string()));
    record.set("is_default", Value::Boolean(false));
    record.set("is_in_roadmap", Value::Boolean(!is_subtask));
    Ok(attach_provenance(record))
}
