use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::str_field;
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "group";

/// §4.6.5 "Groups": created if absent; memberships are reconciled
/// idempotently by a later pass, so this mapper only produces the group
/// record itself. OpenProject's `Group` is a `Principal` subtype and stores
/// its display name in the shared `lastname` column.
pub fn map(source: &SourceRecord, base_url: &str) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: ENTITY,
            origin_key: source.origin_id.to_string(),
            field: "name",
        })?;
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key, format!("{base_url}/admin/groups"));
    let mut record = MappedRecord::new(SourceEntityKind::Group, provenance);
    record.set("lastname", Value::String(name.to_string()));
    Ok(attach_provenance(record))
}
