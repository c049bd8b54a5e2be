use crate::entities::attach_provenance;
use model::{MappedRecord, OriginId, ProvenanceTag, SourceEntityKind, Value};

/// Jira labels are free-text strings attached to issues, not REST entities
/// with their own ids — the extractor assigns each distinct label text a
/// stable synthetic `origin_id` before this ever reaches the sanitizer, so
/// there is no `MappingError` case here: a label string is always valid.
pub fn map(label: &str, origin_id: OriginId, base_url: &str) -> MappedRecord {
    let provenance = ProvenanceTag::jira(
        origin_id,
        label.into(),
        format!("{base_url}/issues/?jql=labels%3D{label}"),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Label, provenance);
    record.set("name", Value::String(label.to_string()));
    attach_provenance(record)
}
