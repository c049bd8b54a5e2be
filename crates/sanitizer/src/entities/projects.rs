use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::link_resolver::LinkResolver;
use crate::payload::{nested, str_field};
use model::{JiraKey, MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "project";
const ENABLED_MODULES: &[&str] = &["work_package_tracking", "wiki", "time_tracking", "costs"];

/// §4.6.5 "Projects": created as a sub-project under a configured parent;
/// lead assigned as admin member; core modules ensured enabled (§8 S2).
pub fn map(
    source: &SourceRecord,
    base_url: &str,
    parent_id: i64,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: ENTITY,
            origin_key: source.origin_id.to_string(),
            field: "key",
        })?;
    let name = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;
    let lead_key = nested(&source.payload, &["lead", "name"]).and_then(|v| v.as_str());

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key.clone(),
        format!("{base_url}/browse/{origin_key}"),
    );
    let mut record = MappedRecord::new(SourceEntityKind::Project, provenance);
    record.set("identifier", Value::String(origin_key.as_str().to_lowercase()));
    record.set("name", Value::String(name.to_string()));
    record.set("parent_id", Value::Int(parent_id));
    record.set(
        "enabled_module_names",
        Value::StringArray(ENABLED_MODULES.iter().map(|s| s.to_string()).collect()),
    );

    if let Some(lead) = lead_key {
        let lead_id = resolver
            .resolve(SourceEntityKind::User, &JiraKey::new(lead))
            .ok_or_else(|| MappingError::UnresolvedLink {
                entity: ENTITY,
                origin_key: origin_key.to_string(),
                target_kind: SourceEntityKind::User,
                target_key: lead.to_string(),
            })?;
        record.set("lead_id", Value::Int(lead_id));
    }

    Ok(attach_provenance(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{MappingCache, OriginId};
    use serde_json::json;

    #[test]
    fn project_with_lead_maps_per_scenario_s2() {
        let source = SourceRecord::new(
            SourceEntityKind::Project,
            OriginId(10),
            Some("NRS".into()),
            json!({ "name": "NR Systems", "lead": { "name": "jdoe" } }),
        );
        let mut cache = MappingCache::new();
        cache.insert(JiraKey::new("jdoe"), 7);
        let resolver = LinkResolver::new().with_cache(SourceEntityKind::User, cache);

        let record = map(&source, "https://jira.example", 1, &resolver).unwrap();
        assert_eq!(record.get("identifier"), Some(&Value::String("nrs".to_string())));
        assert_eq!(record.get("lead_id"), Some(&Value::Int(7)));
        assert_eq!(
            record.get("enabled_module_names"),
            Some(&Value::StringArray(
                ENABLED_MODULES.iter().map(|s| s.to_string()).collect()
            ))
        );
    }

    #[test]
    fn unresolved_lead_is_a_mapping_error() {
        let source = SourceRecord::new(
            SourceEntityKind::Project,
            OriginId(10),
            Some("NRS".into()),
            json!({ "name": "NR Systems", "lead": { "name": "ghost" } }),
        );
        let resolver = LinkResolver::new();
        let err = map(&source, "https://jira.example", 1, &resolver).unwrap_err();
        assert!(matches!(err, MappingError::UnresolvedLink { .. }));
    }
}
