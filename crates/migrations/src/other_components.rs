use crate::error::MigrationError;
use futures::future::BoxFuture;
use model::{JiraKey, MappedRecord, MappingCache, ProvenanceTag, SourceEntityKind, SourceRecord, Value};
use sanitizer::{LinkResolver, MappingError, rewrite_jira_keys};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Attaches the four provenance custom fields, mirroring the sanitizer
/// crate's private helper of the same name (§4.3 rule 6). Kept local since
/// these five components map records outside the sanitizer by design — see
/// the grounding ledger.
fn attach_provenance(mut record: MappedRecord) -> MappedRecord {
    for (field, value) in record.provenance.as_custom_field_pairs() {
        record.set(format!("custom_field:{field}"), Value::String(value));
    }
    record
}

fn required_wp_id(resolver: &LinkResolver, origin_key: &JiraKey) -> Result<i64, MappingError> {
    resolver
        .resolve(SourceEntityKind::Issue, origin_key)
        .ok_or_else(|| MappingError::UnresolvedLink {
            entity: "work_package",
            origin_key: origin_key.to_string(),
            target_kind: SourceEntityKind::Issue,
            target_key: origin_key.to_string(),
        })
}

/// §4.6.5 "Time entries": transformed from Tempo worklogs; dates,
/// durations, and activity types mapped.
pub fn map_time_entry(
    source: &SourceRecord,
    base_url: &str,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "time_entry",
            origin_key: source.origin_id.to_string(),
            field: "issue key",
        })?;
    let wp_id = required_wp_id(resolver, &origin_key)?;

    let hours = source
        .payload
        .get("timeSpentSeconds")
        .and_then(serde_json::Value::as_f64)
        .map(|s| s / 3600.0)
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "time_entry",
            origin_key: origin_key.to_string(),
            field: "timeSpentSeconds",
        })?;
    let spent_on = source
        .payload
        .get("started")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "time_entry",
            origin_key: origin_key.to_string(),
            field: "started",
        })?;
    let comment = source.payload.get("comment").and_then(serde_json::Value::as_str).unwrap_or("");

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key, format!("{base_url}/browse/worklog"));
    let mut record = MappedRecord::new(SourceEntityKind::Worklog, provenance);
    record.set("entity_id", Value::Int(wp_id));
    record.set("entity_type", Value::String("WorkPackage".to_string()));
    record.set("hours", Value::Float(hours));
    record.set("spent_on", Value::String(spent_on[..10].to_string()));
    record.set("comments", Value::String(comment.to_string()));
    Ok(attach_provenance(record))
}

/// §4.6.5 "Relations / inline refs": rewrites bare Jira keys in relation
/// metadata to their migrated work-package ids.
pub fn map_relation(
    source: &SourceRecord,
    base_url: &str,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "relation",
            origin_key: source.origin_id.to_string(),
            field: "key",
        })?;
    let from_id = required_wp_id(resolver, &origin_key)?;

    let target_key = source
        .payload
        .get("targetKey")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "relation",
            origin_key: origin_key.to_string(),
            field: "targetKey",
        })?;
    let to_id = resolver
        .resolve(SourceEntityKind::Issue, &JiraKey::new(target_key))
        .ok_or_else(|| MappingError::UnresolvedLink {
            entity: "relation",
            origin_key: origin_key.to_string(),
            target_kind: SourceEntityKind::Issue,
            target_key: target_key.to_string(),
        })?;
    let relation_type = source
        .payload
        .get("type")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("relates");

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key, format!("{base_url}/browse/relation"));
    let mut record = MappedRecord::new(SourceEntityKind::Relation, provenance);
    record.set("from_id", Value::Int(from_id));
    record.set("to_id", Value::Int(to_id));
    record.set("relation_type", Value::String(relation_type.to_string()));
    Ok(attach_provenance(record))
}

/// §4.6.5: a Jira watcher, mapped once its user and issue both have ids.
pub fn map_watcher(
    source: &SourceRecord,
    base_url: &str,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "watcher",
            origin_key: source.origin_id.to_string(),
            field: "key",
        })?;
    let wp_id = required_wp_id(resolver, &origin_key)?;

    let login = source
        .payload
        .get("name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "watcher",
            origin_key: origin_key.to_string(),
            field: "name",
        })?;
    let user_id = resolver
        .resolve(SourceEntityKind::User, &JiraKey::new(login))
        .ok_or_else(|| MappingError::UnresolvedLink {
            entity: "watcher",
            origin_key: origin_key.to_string(),
            target_kind: SourceEntityKind::User,
            target_key: login.to_string(),
        })?;

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key, format!("{base_url}/browse/watcher"));
    let mut record = MappedRecord::new(SourceEntityKind::Watcher, provenance);
    record.set("watchable_id", Value::Int(wp_id));
    record.set("watchable_type", Value::String("WorkPackage".to_string()));
    record.set("user_id", Value::Int(user_id));
    Ok(attach_provenance(record))
}

/// §4.6.5: a Jira remote link, mapped into the invented dedicated table
/// (see DESIGN.md — `target_class_for("remote_links")`).
pub fn map_remote_link(
    source: &SourceRecord,
    base_url: &str,
    resolver: &LinkResolver,
) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "remote_link",
            origin_key: source.origin_id.to_string(),
            field: "key",
        })?;
    let wp_id = required_wp_id(resolver, &origin_key)?;

    let url = source
        .payload
        .get("object")
        .and_then(|o| o.get("url"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "remote_link",
            origin_key: origin_key.to_string(),
            field: "object.url",
        })?;
    let title = source
        .payload
        .get("object")
        .and_then(|o| o.get("title"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or(url);

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key, format!("{base_url}/browse/remotelink"));
    let mut record = MappedRecord::new(SourceEntityKind::RemoteLink, provenance);
    record.set("work_package_id", Value::Int(wp_id));
    record.set("url", Value::String(url.to_string()));
    record.set("title", Value::String(title.to_string()));
    Ok(attach_provenance(record))
}

/// §4.6.5 "Attachments": downloaded from Jira with a bounded worker pool,
/// then uploaded through the Rails evaluator (never the REST API) because
/// upload must preserve the original author and timestamp. `fetch` performs
/// the actual HTTP download; this function only owns the concurrency bound
/// and the resulting mapping.
pub async fn download_attachments(
    sources: Vec<SourceRecord>,
    base_url: &str,
    resolver: &LinkResolver,
    max_concurrent: usize,
    fetch: impl Fn(&str) -> BoxFuture<'static, Result<Vec<u8>, MigrationError>> + Send + Sync + 'static,
) -> Vec<Result<(MappedRecord, Vec<u8>), MigrationError>> {
    let fetch = Arc::new(fetch);
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = Vec::with_capacity(sources.len());

    for source in sources {
        let semaphore = semaphore.clone();
        let fetch = fetch.clone();
        let base_url = base_url.to_string();
        let resolver_snapshot = resolver.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            map_one_attachment(&source, &base_url, &resolver_snapshot, fetch.as_ref()).await
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(result) => results.push(result),
            Err(join_err) => results.push(Err(MigrationError::TaskJoin(join_err.to_string()))),
        }
    }
    results
}

async fn map_one_attachment(
    source: &SourceRecord,
    base_url: &str,
    resolver: &LinkResolver,
    fetch: &(impl Fn(&str) -> BoxFuture<'static, Result<Vec<u8>, MigrationError>> + Send + Sync + ?Sized),
) -> Result<(MappedRecord, Vec<u8>), MigrationError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "attachment",
            origin_key: source.origin_id.to_string(),
            field: "key",
        })?;
    let wp_id = required_wp_id(resolver, &origin_key)?;

    let content_url = source
        .payload
        .get("content")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: "attachment",
            origin_key: origin_key.to_string(),
            field: "content",
        })?;
    let filename = source
        .payload
        .get("filename")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("attachment.bin");
    let author_login = source
        .payload
        .get("author")
        .and_then(|a| a.get("name"))
        .and_then(serde_json::Value::as_str);
    let author_id = author_login
        .and_then(|login| resolver.resolve(SourceEntityKind::User, &JiraKey::new(login)));
    let created = source.payload.get("created").and_then(serde_json::Value::as_str).unwrap_or("");

    let bytes = fetch(content_url).await?;

    let provenance = ProvenanceTag::jira(source.origin_id, origin_key, content_url.to_string());
    let mut record = MappedRecord::new(SourceEntityKind::Attachment, provenance);
    record.set("container_id", Value::Int(wp_id));
    record.set("container_type", Value::String("WorkPackage".to_string()));
    record.set("file_name", Value::String(filename.to_string()));
    record.set("created_on", Value::String(created.to_string()));
    if let Some(author_id) = author_id {
        record.set("author_id", Value::Int(author_id));
    }
    Ok((attach_provenance(record), bytes))
}

/// Re-applies Jira-key-to-work-package-id rewriting to any free-text field
/// left over after Phase 2 (e.g. a relation comment copied verbatim from
/// Jira) — the `inline_refs` leaf in the dependency graph.
pub fn rewrite_remaining_references(text: &str, resolver: &LinkResolver) -> String {
    rewrite_jira_keys(text, resolver)
}

pub fn warm_issue_cache(cache: MappingCache) -> LinkResolver {
    LinkResolver::new().with_cache(SourceEntityKind::Issue, cache)
}
