use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::link_resolver::LinkResolver;
use crate::payload::{href_tail_id, nested, optional_str, str_field};
use crate::references::rewrite_jira_keys;
use crate::wiki_markup::jira_wiki_to_markdown;
use model::{JiraKey, MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "work_package";

/// Phase 1 (§4.6.3): the minimum viable record — just enough to get an id so
/// other work packages in the same scope can reference it in Phase 2.
pub fn map_skeleton(
    source: &SourceRecord,
    base_url: &str,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let origin_key = required_key(source)?;
    let fields = source
        .payload
        .get("fields")
        .ok_or_else(|| malformed(&origin_key, "missing fields envelope"))?;

    let subject = str_field(fields, ENTITY, origin_key.as_str(), "summary")?;
    let project_key = nested(fields, &["project", "key"])
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed(&origin_key, "missing fields.project.key"))?;
    let type_jira_id = nested(fields, &["issuetype"])
        .and_then(href_tail_id)
        .ok_or_else(|| malformed(&origin_key, "missing fields.issuetype.self"))?;
    let status_jira_id = nested(fields, &["status"])
        .and_then(href_tail_id)
        .ok_or_else(|| malformed(&origin_key, "missing fields.status.self"))?;
    let reporter_key = nested(fields, &["reporter", "name"])
        .and_then(|v| v.as_str())
        .ok_or_else(|| malformed(&origin_key, "missing fields.reporter.name"))?;

    let project_id = resolve(&origin_key, SourceEntityKind::Project, project_key, resolver)?;
    let type_id = resolve(&origin_key, SourceEntityKind::IssueType, &type_jira_id.to_string(), resolver)?;
    let status_id = resolve(&origin_key, SourceEntityKind::Status, &status_jira_id.to_string(), resolver)?;
    let author_id = resolve(&origin_key, SourceEntityKind::User, reporter_key, resolver)?;

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key.clone(),
        format!("{base_url}/browse/{origin_key}"),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Issue, provenance);
    record.set("subject", Value::String(subject.to_string()));
    record.set("project_id", Value::Int(project_id));
    record.set("type_id", Value::Int(type_id));
    record.set("status_id", Value::Int(status_id));
    record.set("author_id", Value::Int(author_id));
    Ok(attach_provenance(record))
}

/// Phase 2 (§4.6.3): the remaining attributes, including cross-references
/// that can only resolve once every skeleton in scope exists (§8 #9, S3).
pub fn map_content(source: &SourceRecord, resolver: &LinkResolver) -> Result<MappedRecord, MappingError> {
    let origin_key = required_key(source)?;
    let fields = source
        .payload
        .get("fields")
        .ok_or_else(|| malformed(&origin_key, "missing fields envelope"))?;

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key.clone(), String::new());
    let mut record = MappedRecord::new(SourceEntityKind::Issue, provenance);

    if let Some(description) = optional_str(fields, "description") {
        let markdown = jira_wiki_to_markdown(description);
        record.set("description", Value::String(rewrite_jira_keys(&markdown, resolver)));
    }
    if let Some(priority_id) = nested(fields, &["priority"]).and_then(href_tail_id) {
        let id = resolve(&origin_key, SourceEntityKind::Priority, &priority_id.to_string(), resolver)?;
        record.set("priority_id", Value::Int(id));
    }
    if let Some(assignee_key) = nested(fields, &["assignee", "name"]).and_then(|v| v.as_str()) {
        let id = resolve(&origin_key, SourceEntityKind::User, assignee_key, resolver)?;
        record.set("assigned_to_id", Value::Int(id));
    }
    if let Some(due_date) = optional_str(fields, "duedate") {
        record.set("due_date", Value::String(due_date.to_string()));
    }

    Ok(attach_provenance(record))
}

fn required_key(source: &SourceRecord) -> Result<JiraKey, MappingError> {
    source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: ENTITY,
            origin_key: source.origin_id.to_string(),
            field: "key",
        })
}

fn malformed(origin_key: &JiraKey, detail: &str) -> MappingError {
    MappingError::MalformedPayload {
        entity: ENTITY,
        origin_key: origin_key.to_string(),
        detail: detail.to_string(),
    }
}

fn resolve(
    origin_key: &JiraKey,
    kind: SourceEntityKind,
    target_key: &str,
    resolver: &LinkResolver,
) -> Result<i64, MappingError> {
    resolver
        .resolve(kind, &JiraKey::new(target_key))
        .ok_or_else(|| MappingError::UnresolvedLink {
            entity: ENTITY,
            origin_key: origin_key.to_string(),
            target_kind: kind,
            target_key: target_key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{MappingCache, OriginId};
    use serde_json::json;

    fn resolver() -> LinkResolver {
        let mut projects = MappingCache::new();
        projects.insert(JiraKey::new("NRS"), 1);
        let mut types = MappingCache::new();
        types.insert(JiraKey::new("5"), 2);
        let mut statuses = MappingCache::new();
        statuses.insert(JiraKey::new("3"), 3);
        let mut users = MappingCache::new();
        users.insert(JiraKey::new("jdoe"), 9);
        LinkResolver::new()
            .with_cache(SourceEntityKind::Project, projects)
            .with_cache(SourceEntityKind::IssueType, types)
            .with_cache(SourceEntityKind::Status, statuses)
            .with_cache(SourceEntityKind::User, users)
    }

    fn skeleton_source() -> SourceRecord {
        SourceRecord::new(
            SourceEntityKind::Issue,
            OriginId(100),
            Some("NRS-1".into()),
            json!({
                "fields": {
                    "summary": "Fix the thing",
                    "project": { "key": "NRS" },
                    "issuetype": { "self": "https://jira.example/rest/api/2/issuetype/5" },
                    "status": { "self": "https://jira.example/rest/api/2/status/3" },
                    "reporter": { "name": "jdoe" },
                }
            }),
        )
    }

    #[test]
    fn skeleton_resolves_every_cross_reference() {
        let record = map_skeleton(&skeleton_source(), "https://jira.example", &resolver()).unwrap();
        assert_eq!(record.get("project_id"), Some(&Value::Int(1)));
        assert_eq!(record.get("type_id"), Some(&Value::Int(2)));
        assert_eq!(record.get("status_id"), Some(&Value::Int(3)));
        assert_eq!(record.get("author_id"), Some(&Value::Int(9)));
        assert!(record.is_pure());
    }

    #[test]
    fn content_rewrites_cross_referenced_issue_keys() {
        let mut issues = MappingCache::new();
        issues.insert(JiraKey::new("NRS-2"), 456);
        let resolver = resolver().with_cache(SourceEntityKind::Issue, issues);

        let source = SourceRecord::new(
            SourceEntityKind::Issue,
            OriginId(101),
            Some("NRS-1".into()),
            json!({ "fields": { "description": "blocks NRS-2" } }),
        );
        let record = map_content(&source, &resolver).unwrap();
        let description = record.get("description").unwrap().as_str().unwrap();
        assert!(description.contains("WP#456"));
        assert!(!description.contains("NRS-2"));
    }
}
