use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::str_field;
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "priority";

pub fn map(source: &SourceRecord, base_url: &str, position: i64) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .unwrap_or_else(|| source.origin_id.to_string().into());
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/rest/api/2/priority/{}", source.origin_id),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Priority, provenance);
    record.set("name", Value::String(name.to_string()));
    record.set("position", Value::Int(position));
    Ok(attach_provenance(record))
}
