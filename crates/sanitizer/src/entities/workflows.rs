use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::link_resolver::LinkResolver;
use model::{JiraKey, MappedRecord, OriginId, ProvenanceTag, SourceEntityKind, Value};

const ENTITY: &str = "workflow";

/// One resolved Jira workflow transition, flattened upstream from a workflow
/// scheme's transition table. OpenProject models workflows as
/// `(type, old_status, new_status)` triples rather than a single scheme
/// document, so the extractor produces one of these per edge before the
/// sanitizer ever runs.
#[derive(Debug, Clone)]
pub struct WorkflowTransition {
    pub issue_type_key: String,
    pub from_status_key: String,
    pub to_status_key: String,
}

pub fn map(
    transition: &WorkflowTransition,
    origin_id: OriginId,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let type_id = resolve(origin_id, SourceEntityKind::IssueType, &transition.issue_type_key, resolver)?;
    let old_status_id = resolve(origin_id, SourceEntityKind::Status, &transition.from_status_key, resolver)?;
    let new_status_id = resolve(origin_id, SourceEntityKind::Status, &transition.to_status_key, resolver)?;

    let provenance = ProvenanceTag::jira(
        origin_id,
        JiraKey::new(format!(
            "{}:{}:{}",
            transition.issue_type_key, transition.from_status_key, transition.to_status_key
        )),
        String::new(),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Workflow, provenance);
    record.set("type_id", Value::Int(type_id));
    record.set("old_status_id", Value::Int(old_status_id));
    record.set("new_status_id", Value::Int(new_status_id));
    Ok(attach_provenance(record))
}

fn resolve(
    origin_id: OriginId,
    kind: SourceEntityKind,
    target_key: &str,
    resolver: &LinkResolver,
) -> Result<i64, MappingError> {
    resolver
        .resolve(kind, &JiraKey::new(target_key))
        .ok_or_else(|| MappingError::UnresolvedLink {
            entity: ENTITY,
            origin_key: origin_id.to_string(),
            target_kind: kind,
            target_key: target_key.to_string(),
        })
}
