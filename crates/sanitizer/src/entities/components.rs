use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::str_field;
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "component";

/// Jira components map to OpenProject categories (§4.6 component list
/// entry `components`).
pub fn map(source: &SourceRecord, base_url: &str, project_id: i64) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .unwrap_or_else(|| source.origin_id.to_string().into());
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/rest/api/2/component/{}", source.origin_id),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Component, provenance);
    record.set("name", Value::String(name.to_string()));
    record.set("project_id", Value::Int(project_id));
    Ok(attach_provenance(record))
}
