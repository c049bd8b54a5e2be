use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::{optional_bool, optional_str, str_field};
use crate::wiki_markup::jira_wiki_to_markdown;
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "version";

pub fn map(source: &SourceRecord, base_url: &str, project_id: i64) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .unwrap_or_else(|| source.origin_id.to_string().into());
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;
    let released = optional_bool(&source.payload, "released").unwrap_or(false);
    let archived = optional_bool(&source.payload, "archived").unwrap_or(false);

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/rest/api/2/version/{}", source.origin_id),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Version, provenance);
    record.set("name", Value::String(name.to_string()));
    record.set("project_id", Value::Int(project_id));
    let status = if archived {
        "closed"
    } else if released {
        "locked"
    } else {
        "open"
    };
    record.set("status", Value::String(status.to_string()));
    if let Some(description) = optional_str(&source.payload, "description") {
        record.set("description", Value::String(jira_wiki_to_markdown(description)));
    }
    Ok(attach_provenance(record))
}
