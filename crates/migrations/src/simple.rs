use crate::component::{BatchCheckpoint, LoadReport, report_from_result};
use crate::error::MigrationError;
use model::{Batch, MappedRecord, SourceEntityKind, SourceRecord};
use provenance::ProvenanceStore;
use remote_exec::EvaluatorClient;
use script_composer::{ScriptKind, compose_create};
use std::time::Duration;
use tracing::{info, warn};

/// Runs the shared create-only Load path (§4.6.1, §4.4 rule) for every
/// component whose body is [`ScriptKind::GenericCreate`]: map each source
/// record, skip the ones `find_by_provenance` already resolves, batch and
/// create the rest. Entities with richer mapping needs (extra lookups,
/// cross-references) supply that via `mapper`'s closure capture — this
/// function only knows the shared shape, not any entity's specifics.
///
/// `checkpoint` gives the component batch-level fast-forward (§4.5): any
/// batch index already committed in a prior invocation of the same run is
/// skipped instead of re-sent to the evaluator. Batches are numbered over
/// the stable mapped-record order, not over the post-provenance-filter
/// list — that list shrinks as records get tagged, so indexing it directly
/// would renumber every batch after a restart and make `start_index` skip
/// the wrong work. The provenance check instead runs per-record *inside*
/// each batch, same as before, so a batch that partially completed before
/// a crash is safely resent and only creates what's still missing.
pub async fn run_simple_component(
    component: &str,
    kind: SourceEntityKind,
    sources: Vec<SourceRecord>,
    mapper: impl Fn(&SourceRecord) -> Result<MappedRecord, sanitizer::MappingError>,
    provenance_store: &ProvenanceStore,
    evaluator: &EvaluatorClient,
    remote_temp_dir: &str,
    batch_size: usize,
    timeout: Duration,
    checkpoint: &BatchCheckpoint<'_>,
) -> Result<LoadReport, MigrationError> {
    let mut report = LoadReport::default();
    let mut mapped_records = Vec::with_capacity(sources.len());

    for source in &sources {
        match mapper(source) {
            Ok(record) => mapped_records.push(record),
            Err(err) => {
                warn!(component, error = %err, "mapping failed, recording and continuing");
                report.failed += 1;
                report.errors.push(err.to_string());
            }
        }
    }

    let start_index = checkpoint.start_index().await?;

    for batch in Batch::chunk(mapped_records, batch_size.max(1)) {
        if batch.index.0 < start_index {
            info!(component, batch = batch.index.0, "batch already committed in a prior run, skipping");
            continue;
        }

        let mut pending = Vec::with_capacity(batch.records.len());
        for mapped in batch.records {
            let already = provenance_store
                .find_by_provenance(component, kind, &mapped.provenance.origin_key)
                .await?;
            match already {
                Some(_) => report.skipped += 1,
                None => pending.push(mapped),
            }
        }

        if !pending.is_empty() {
            let input_path = format!("{remote_temp_dir}/j2o_input_{component}_{}.json", batch.index);
            let result_path = format!("{remote_temp_dir}/j2o_result_{component}_{}.json", batch.index);
            let composed = compose_create(component, ScriptKind::GenericCreate, &pending, &input_path, &result_path)?;
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
        }

        checkpoint.advance(batch.index).await?;
    }

    Ok(report)
}
