use crate::error::ComposerError;
use crate::head::{HeadParams, compose_head};
use crate::templates::{ScriptKind, target_class_for};
use model::{JiraKey, MappedRecord, RemoteScript};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// A composed script plus the JSON payload that must be copied to
/// `input_file_path` before it runs. Kept separate from [`RemoteScript`]
/// since the script itself only ever carries the remote path, never the
/// bytes (§3.1).
#[derive(Debug, Clone)]
pub struct ComposedScript {
    pub script: RemoteScript,
    pub input_payload: Vec<u8>,
}

#[derive(Serialize)]
struct CreateRow<'a> {
    jira_key: String,
    attributes: &'a std::collections::BTreeMap<String, model::Value>,
}

#[derive(Serialize)]
struct ContentRow<'a> {
    jira_key: String,
    wp_id: i64,
    attributes: &'a std::collections::BTreeMap<String, model::Value>,
}

/// One reconstructed journal row ready for the replay script (§4.6.4),
/// paired with the work package it belongs to. `v1_state_snapshot`/
/// `v1_cf_state_snapshot`/`v1_end` update the skeleton's existing version-1
/// journal in place (rule 1); `journals` are versions 2..N for bulk
/// insertion.
#[derive(Debug, Clone)]
pub struct JournalBatchEntry {
    pub jira_key: String,
    pub wp_id: i64,
    pub v1_state_snapshot: std::collections::BTreeMap<String, model::Value>,
    pub v1_cf_state_snapshot: std::collections::BTreeMap<String, model::Value>,
    pub v1_end: Option<chrono::DateTime<chrono::Utc>>,
    pub journals: Vec<model::JournalRow>,
}

#[derive(Serialize)]
struct JournalWireRow {
    version: u32,
    author_id: i64,
    notes: String,
    begin: chrono::DateTime<chrono::Utc>,
    end: Option<chrono::DateTime<chrono::Utc>>,
    state_snapshot: std::collections::BTreeMap<String, model::Value>,
    cf_state_snapshot: std::collections::BTreeMap<String, model::Value>,
}

#[derive(Serialize)]
struct JournalRow<'a> {
    jira_key: &'a str,
    wp_id: i64,
    v1_state_snapshot: &'a std::collections::BTreeMap<String, model::Value>,
    v1_cf_state_snapshot: &'a std::collections::BTreeMap<String, model::Value>,
    v1_end: Option<chrono::DateTime<chrono::Utc>>,
    journals: Vec<JournalWireRow>,
}

/// One tag write for the idempotent provenance-tagging script (§4.4).
#[derive(Debug, Clone)]
pub struct TagBatchEntry {
    pub jira_key: String,
    pub wp_id: i64,
    pub tags: Vec<(&'static str, String)>,
}

#[derive(Serialize)]
struct TagRow<'a> {
    jira_key: &'a str,
    wp_id: i64,
    tags: std::collections::BTreeMap<&'static str, String>,
}

fn serialize_payload(rows: impl Serialize) -> Result<Vec<u8>, ComposerError> {
    serde_json::to_vec(&json!({ "rows": rows })).map_err(|e| ComposerError::Serialize(e.to_string()))
}

/// Composes a create-and-collect script for a batch of freshly sanitized
/// records (§4.2, §4.6.1 Load phase). Used by every component whose body is
/// [`ScriptKind::GenericCreate`] or [`ScriptKind::WorkPackagesSkeleton`].
pub fn compose_create(
    component: &str,
    kind: ScriptKind,
    records: &[MappedRecord],
    input_file_path: &str,
    result_file_path: &str,
) -> Result<ComposedScript, ComposerError> {
    let target_class = target_class_for(component)?;
    let rows: Vec<_> = records
        .iter()
        .map(|r| CreateRow {
            jira_key: r.provenance.origin_key.to_string(),
            attributes: &r.attributes,
        })
        .collect();
    let input_payload = serialize_payload(rows)?;
    debug!(component, records = records.len(), "composed create script");

    let head = compose_head(&HeadParams {
        input_path: Some(input_file_path.to_string()),
        result_path: result_file_path.to_string(),
        target_class_name: Some(target_class.to_string()),
        origin_key_field_id: None,
    });

    Ok(ComposedScript {
        script: RemoteScript {
            head_text: head,
            body_text: kind.body_text().to_string(),
            input_file_path: Some(input_file_path.to_string()),
            result_file_path: result_file_path.to_string(),
        },
        input_payload,
    })
}

/// Composes the work-package content (phase two) script: loads an existing
/// skeleton by id and assigns the rest of its attributes, including
/// cross-references that could only be resolved once every skeleton existed
/// (§4.6.3).
pub fn compose_work_packages_content(
    records_with_ids: &[(i64, MappedRecord)],
    input_file_path: &str,
    result_file_path: &str,
) -> Result<ComposedScript, ComposerError> {
    let rows: Vec<_> = records_with_ids
        .iter()
        .map(|(wp_id, record)| ContentRow {
            jira_key: record.provenance.origin_key.to_string(),
            wp_id: *wp_id,
            attributes: &record.attributes,
        })
        .collect();
    let input_payload = serialize_payload(rows)?;

    let head = compose_head(&HeadParams {
        input_path: Some(input_file_path.to_string()),
        result_path: result_file_path.to_string(),
        target_class_name: None,
        origin_key_field_id: None,
    });

    Ok(ComposedScript {
        script: RemoteScript {
            head_text: head,
            body_text: ScriptKind::WorkPackagesContent.body_text().to_string(),
            input_file_path: Some(input_file_path.to_string()),
            result_file_path: result_file_path.to_string(),
        },
        input_payload,
    })
}

/// Composes the journal replay script (§4.6.4 rule 10): updates each work
/// package's existing version-1 journal in place (rule 1), deletes any
/// `version > 1` rows, then bulk-inserts the reconstructed set. Safe to run
/// twice — the delete makes every run idempotent.
pub fn compose_journals_replace(
    entries: &[JournalBatchEntry],
    input_file_path: &str,
    result_file_path: &str,
) -> Result<ComposedScript, ComposerError> {
    let rows: Vec<_> = entries
        .iter()
        .map(|entry| JournalRow {
            jira_key: &entry.jira_key,
            wp_id: entry.wp_id,
            v1_state_snapshot: &entry.v1_state_snapshot,
            v1_cf_state_snapshot: &entry.v1_cf_state_snapshot,
            v1_end: entry.v1_end,
            journals: entry
                .journals
                .iter()
                .map(|j| JournalWireRow {
                    version: j.version,
                    author_id: j.author_id,
                    notes: j.notes.clone(),
                    begin: j.validity_period.begin,
                    end: j.validity_period.end,
                    state_snapshot: j.state_snapshot.clone(),
                    cf_state_snapshot: j.cf_state_snapshot.clone(),
                })
                .collect(),
        })
        .collect();
    let input_payload = serialize_payload(rows)?;

    let head = compose_head(&HeadParams {
        input_path: Some(input_file_path.to_string()),
        result_path: result_file_path.to_string(),
        target_class_name: None,
        origin_key_field_id: None,
    });

    Ok(ComposedScript {
        script: RemoteScript {
            head_text: head,
            body_text: ScriptKind::JournalsReplace.body_text().to_string(),
            input_file_path: Some(input_file_path.to_string()),
            result_file_path: result_file_path.to_string(),
        },
        input_payload,
    })
}

/// Composes the provenance lookup script (§4.4 `find_by_provenance`): a
/// read-only query joining on the `"J2O Origin Key"` custom field.
pub fn compose_find_by_provenance(
    component: &str,
    jira_keys: &[JiraKey],
    origin_key_field_id: i64,
    input_file_path: &str,
    result_file_path: &str,
) -> Result<ComposedScript, ComposerError> {
    let target_class = target_class_for(component)?;
    #[derive(Serialize)]
    struct LookupRow {
        jira_key: String,
    }
    let rows: Vec<_> = jira_keys
        .iter()
        .map(|k| LookupRow {
            jira_key: k.to_string(),
        })
        .collect();
    let input_payload = serialize_payload(rows)?;

    let head = compose_head(&HeadParams {
        input_path: Some(input_file_path.to_string()),
        result_path: result_file_path.to_string(),
        target_class_name: Some(target_class.to_string()),
        origin_key_field_id: Some(origin_key_field_id),
    });

    Ok(ComposedScript {
        script: RemoteScript {
            head_text: head,
            body_text: ScriptKind::FindByProvenance.body_text().to_string(),
            input_file_path: Some(input_file_path.to_string()),
            result_file_path: result_file_path.to_string(),
        },
        input_payload,
    })
}

/// Composes the idempotent provenance-tagging script (§4.4 `ensure_tagged`):
/// writes the four origin custom fields on each record, skipping any whose
/// value already matches.
pub fn compose_ensure_tagged(
    component: &str,
    entries: &[TagBatchEntry],
    input_file_path: &str,
    result_file_path: &str,
) -> Result<ComposedScript, ComposerError> {
    let target_class = target_class_for(component)?;
    let rows: Vec<_> = entries
        .iter()
        .map(|entry| TagRow {
            jira_key: &entry.jira_key,
            wp_id: entry.wp_id,
            tags: entry.tags.iter().cloned().collect(),
        })
        .collect();
    let input_payload = serialize_payload(rows)?;

    let head = compose_head(&HeadParams {
        input_path: Some(input_file_path.to_string()),
        result_path: result_file_path.to_string(),
        target_class_name: Some(target_class.to_string()),
        origin_key_field_id: None,
    });

    Ok(ComposedScript {
        script: RemoteScript {
            head_text: head,
            body_text: ScriptKind::EnsureTagged.body_text().to_string(),
            input_file_path: Some(input_file_path.to_string()),
            result_file_path: result_file_path.to_string(),
        },
        input_payload,
    })
}

/// Composes the mapping-cache builder script (§4.4 `build_mapping_cache`):
/// scans every provenance-tagged record of one component and returns its
/// `jira_key -> openproject_id` pairs. No input file — the whole script runs
/// off the two head parameters.
pub fn compose_build_mapping_cache(
    component: &str,
    origin_key_field_id: i64,
    result_file_path: &str,
) -> Result<RemoteScript, ComposerError> {
    let target_class = target_class_for(component)?;
    let head = compose_head(&HeadParams {
        input_path: None,
        result_path: result_file_path.to_string(),
        target_class_name: Some(target_class.to_string()),
        origin_key_field_id: Some(origin_key_field_id),
    });

    Ok(RemoteScript {
        head_text: head,
        body_text: ScriptKind::BuildMappingCache.body_text().to_string(),
        input_file_path: None,
        result_file_path: result_file_path.to_string(),
    })
}

/// Composes the one-shot custom-field lookup script (§4.4): resolves the
/// OpenProject id of a custom field by name. Reuses `target_class_name` to
/// carry the field name rather than adding a head parameter only this script
/// needs. No input file.
pub fn compose_resolve_custom_field_id(
    field_name: &str,
    result_file_path: &str,
) -> Result<RemoteScript, ComposerError> {
    let head = compose_head(&HeadParams {
        input_path: None,
        result_path: result_file_path.to_string(),
        target_class_name: Some(field_name.to_string()),
        origin_key_field_id: None,
    });

    Ok(RemoteScript {
        head_text: head,
        body_text: ScriptKind::ResolveCustomFieldId.body_text().to_string(),
        input_file_path: None,
        result_file_path: result_file_path.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{OriginId, OriginSystem, ProvenanceTag, SourceEntityKind, Value};

    fn record(key: &str) -> MappedRecord {
        let mut r = MappedRecord::new(
            SourceEntityKind::User,
            ProvenanceTag::jira(OriginId(1), JiraKey::new(key), "https://jira.example/browse/X"),
        );
        r.set("login", Value::String("jdoe".to_string()));
        r
    }

    #[test]
    fn compose_create_embeds_target_class_and_rows() {
        let composed =
            compose_create("users", ScriptKind::GenericCreate, &[record("NRS-1")], "/tmp/in.json", "/tmp/out.json")
                .unwrap();
        assert!(composed.script.head_text.contains(r#"target_class_name = "User""#));
        assert!(composed.script.body_text.contains("Object.const_get"));
        let payload: serde_json::Value = serde_json::from_slice(&composed.input_payload).unwrap();
        assert_eq!(payload["rows"][0]["jira_key"], "NRS-1");
    }

    #[test]
    fn unknown_component_is_rejected_before_any_script_is_built() {
        let err = compose_create("not_a_component", ScriptKind::GenericCreate, &[], "/tmp/in.json", "/tmp/out.json")
            .unwrap_err();
        assert!(matches!(err, ComposerError::UnknownComponent(_)));
    }

    #[test]
    fn attacker_controlled_login_cannot_break_out_of_its_literal() {
        let mut r = record("NRS-2");
        r.set(
            "login",
            Value::String("a\"); system('rm -rf /'); (\"".to_string()),
        );
        let composed =
            compose_create("users", ScriptKind::GenericCreate, &[r], "/tmp/in.json", "/tmp/out.json").unwrap();
        // the hostile string only ever appears inside the JSON input payload,
        // never spliced into the head or body Ruby source.
        assert!(!composed.script.full_source().contains("rm -rf"));
    }
}
