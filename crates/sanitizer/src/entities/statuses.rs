use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::{nested, str_field};
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "status";

pub fn map(source: &SourceRecord, base_url: &str) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .unwrap_or_else(|| source.origin_id.to_string().into());
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;
    let is_closed = nested(&source.payload, &["statusCategory", "key"])
        .and_then(|v| v.as_str())
        .map(|key| key == "done")
        .unwrap_or(false);

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/rest/api/2/status/{}", source.origin_id),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Status, provenance);
    record.set("name", Value::String(name.to_string()));
    record.set("is_closed", Value::Boolean(is_closed));
    Ok(attach_provenance(record))
}
