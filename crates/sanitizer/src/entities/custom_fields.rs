use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::{nested, optional_bool, str_field};
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "custom_field";

pub fn map(source: &SourceRecord, base_url: &str) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .unwrap_or_else(|| source.origin_id.to_string().into());
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;
    let schema_type = nested(&source.payload, &["schema", "type"])
        .and_then(|v| v.as_str())
        .unwrap_or("string");
    let is_required = optional_bool(&source.payload, "required").unwrap_or(false);

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/rest/api/2/customFields/{}", source.origin_id),
    );
    let mut record = MappedRecord::new(SourceEntityKind::CustomField, provenance);
    record.set("name", Value::String(name.to_string()));
    record.set("field_format", Value::String(map_field_format(schema_type).to_string()));
    record.set("is_required", Value::Boolean(is_required));
    record.set("type", Value::String("WorkPackageCustomField".to_string()));
    Ok(attach_provenance(record))
}

fn map_field_format(jira_type: &str) -> &'static str {
    match jira_type {
        "number" => "int",
        "date" => "date",
        "datetime" => "date",
        "option" | "array" => "list",
        "user" => "user",
        _ => "text",
    }
}
