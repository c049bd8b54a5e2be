use crate::component::{BatchCheckpoint, LoadReport, report_from_result};
use crate::error::MigrationError;
use crate::journal::{RawOperation, reconstruct_journals};
use model::{Batch, JiraKey, MappingCache, SourceEntityKind, SourceRecord};
use provenance::ProvenanceStore;
use remote_exec::EvaluatorClient;
use sanitizer::LinkResolver;
use sanitizer::entities::work_packages;
use script_composer::{JournalBatchEntry, ScriptKind, compose_create, compose_journals_replace, compose_work_packages_content};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Everything needed to reconstruct and replay one work package's journal
/// history (§4.6.3 Phase 2, §4.6.4). Producing `raw_operations` from a
/// Jira changelog is a per-issue mapping concern upstream of this module;
/// this struct is the boundary between that mapping and the replay itself.
pub struct JournalInput {
    pub jira_key: JiraKey,
    pub wp_id: i64,
    pub creation_state: BTreeMap<String, model::Value>,
    pub creation_cf_state: BTreeMap<String, model::Value>,
    pub wp_author_id: Option<i64>,
    pub raw_operations: Vec<RawOperation>,
}

/// Runs Phase 1 (§4.6.3): create one minimal work package per Jira issue,
/// skipping any the provenance store already resolves, and return the
/// `origin_key -> target_id` mapping every Phase 2 cross-reference needs.
///
/// Batches are numbered over the full mapped-record order so `checkpoint`'s
/// fast-forward (§4.5) stays valid across restarts; see [`crate::simple`]'s
/// module doc for why the provenance check has to run inside the batch loop
/// rather than before it.
pub async fn run_skeleton(
    sources: &[SourceRecord],
    base_url: &str,
    resolver: &LinkResolver,
    provenance_store: &ProvenanceStore,
    evaluator: &EvaluatorClient,
    remote_temp_dir: &str,
    batch_size: usize,
    timeout: Duration,
    checkpoint: &BatchCheckpoint<'_>,
) -> Result<(LoadReport, MappingCache), MigrationError> {
    let mut report = LoadReport::default();
    let mut mapping = MappingCache::new();
    let mut mapped_records = Vec::with_capacity(sources.len());

    for source in sources {
        match work_packages::map_skeleton(source, base_url, resolver) {
            Ok(record) => mapped_records.push(record),
            Err(err) => {
                report.failed += 1;
                report.errors.push(err.to_string());
            }
        }
    }

    let start_index = checkpoint.start_index().await?;

    for batch in Batch::chunk(mapped_records, batch_size.max(1)) {
        if batch.index.0 < start_index {
            info!(batch = batch.index.0, "work package skeleton batch already committed, skipping");
            continue;
        }

        let mut pending = Vec::with_capacity(batch.records.len());
        for mapped in batch.records {
            let origin_key = mapped.provenance.origin_key.clone();
            match provenance_store
                .find_by_provenance("work_packages_skeleton", SourceEntityKind::Issue, &origin_key)
                .await?
            {
                Some(existing_id) => {
                    mapping.insert(origin_key, existing_id);
                    report.skipped += 1;
                }
                None => pending.push(mapped),
            }
        }

        if !pending.is_empty() {
            let input_path = format!("{remote_temp_dir}/j2o_input_wps_{}.json", batch.index);
            let result_path = format!("{remote_temp_dir}/j2o_result_wps_{}.json", batch.index);
            let composed = compose_create(
                "work_packages_skeleton",
                ScriptKind::WorkPackagesSkeleton,
                &pending,
                &input_path,
                &result_path,
            )?;
            let result = evaluator
                .execute(
                    &composed.script.full_source(),
                    Some(&composed.input_payload),
                    Some(&input_path),
                    &result_path,
                    timeout,
                )
                .await?;
            for row in &result.results {
                if let (Some(wp_id), Some(jira_key)) = (row.wp_id, &row.jira_key) {
                    mapping.insert(JiraKey::new(jira_key.as_str()), wp_id);
                }
            }
            report.merge(report_from_result(&result));
        }

        checkpoint.advance(batch.index).await?;
    }

    Ok((report, mapping))
}

/// Runs Phase 2 (§4.6.3): fill in descriptions (with cross-references
/// rewritten), custom-field values, and the rest of each work package's
/// attributes, now that every skeleton in scope has an id.
///
/// Unlike the skeleton phase, content application carries no per-record
/// provenance check — it's a plain attribute overwrite on an id the
/// skeleton phase already resolved, so `pending`'s order is stable across
/// restarts on its own and batch indices can be taken directly from it.
pub async fn run_content(
    sources: &[SourceRecord],
    resolver: &LinkResolver,
    skeleton_mapping: &MappingCache,
    evaluator: &EvaluatorClient,
    remote_temp_dir: &str,
    batch_size: usize,
    timeout: Duration,
    checkpoint: &BatchCheckpoint<'_>,
) -> Result<LoadReport, MigrationError> {
    let mut report = LoadReport::default();
    let mut pending = Vec::new();

    for source in sources {
        let origin_key = match &source.origin_key {
            Some(key) => key.clone(),
            None => continue,
        };
        let Some(wp_id) = skeleton_mapping.get(&origin_key) else {
            report.failed += 1;
            report.errors.push(format!("{origin_key}: no skeleton id found for content phase"));
            continue;
        };
        match work_packages::map_content(source, resolver) {
            Ok(record) => pending.push((wp_id, record)),
            Err(err) => {
                report.failed += 1;
                report.errors.push(err.to_string());
            }
        }
    }

    let start_index = checkpoint.start_index().await?;

    for (i, batch) in pending.chunks(batch_size.max(1)).enumerate() {
        let index = model::BatchIndex(i as u64);
        if index.0 < start_index {
            info!(batch = index.0, "work package content batch already committed, skipping");
            continue;
        }

        let input_path = format!("{remote_temp_dir}/j2o_input_wpc_{index}.json");
        let result_path = format!("{remote_temp_dir}/j2o_result_wpc_{index}.json");
        let composed = compose_work_packages_content(batch, &input_path, &result_path)?;
        let result = evaluator
            .execute(
                &composed.script.full_source(),
                Some(&composed.input_payload),
                Some(&input_path),
                &result_path,
                timeout,
            )
            .await?;
        report.merge(report_from_result(&result));
        checkpoint.advance(index).await?;
    }

    Ok(report)
}

/// Reconstructs and idempotently replays journal history for a batch of
/// work packages (§4.6.4 rule 10: update v1 in place, delete v2+, then
/// bulk-insert the reconstructed set).
pub async fn replay_journals(
    inputs: Vec<JournalInput>,
    system_deleted_user_id: i64,
    evaluator: &EvaluatorClient,
    remote_temp_dir: &str,
    timeout: Duration,
) -> Result<LoadReport, MigrationError> {
    let mut entries = Vec::with_capacity(inputs.len());
    for input in inputs {
        let reconstructed = reconstruct_journals(
            input.creation_state,
            input.creation_cf_state,
            input.raw_operations,
            input.wp_author_id,
            system_deleted_user_id,
        );
        entries.push(JournalBatchEntry {
            jira_key: input.jira_key.to_string(),
            wp_id: input.wp_id,
            v1_state_snapshot: reconstructed.v1_state_snapshot,
            v1_cf_state_snapshot: reconstructed.v1_cf_state_snapshot,
            v1_end: reconstructed.v1_end,
            journals: reconstructed.appended,
        });
    }

    let input_path = format!("{remote_temp_dir}/j2o_input_journals.json");
    let result_path = format!("{remote_temp_dir}/j2o_result_journals.json");
    let composed = compose_journals_replace(&entries, &input_path, &result_path)?;
    let result = evaluator
        .execute(
            &composed.script.full_source(),
            Some(&composed.input_payload),
            Some(&input_path),
            &result_path,
            timeout,
        )
        .await?;
    Ok(report_from_result(&result))
}
