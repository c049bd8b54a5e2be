use crate::error::ProvenanceError;
use model::provenance::CF_ORIGIN_KEY;
use model::{JiraKey, MappingCache, SourceEntityKind};
use remote_exec::EvaluatorClient;
use script_composer::{TagBatchEntry, compose_build_mapping_cache, compose_ensure_tagged, compose_find_by_provenance, compose_resolve_custom_field_id};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// L4 (§4.4): the single place that knows whether a Jira entity has already
/// been migrated. Every component's Load calls `find_by_provenance` before
/// `create`, so this is consulted far more often than it's written to — the
/// in-memory caches exist for that reason, not as an optimization afterthought.
pub struct ProvenanceStore {
    evaluator: EvaluatorClient,
    remote_temp_dir: String,
    timeout: Duration,
    origin_key_field_id: RwLock<Option<i64>>,
    caches: RwLock<HashMap<SourceEntityKind, MappingCache>>,
}

impl ProvenanceStore {
    pub fn new(evaluator: EvaluatorClient, remote_temp_dir: impl Into<String>, timeout: Duration) -> Self {
        Self {
            evaluator,
            remote_temp_dir: remote_temp_dir.into(),
            timeout,
            origin_key_field_id: RwLock::new(None),
            caches: RwLock::new(HashMap::new()),
        }
    }

    /// The single evaluator connection backing this store, shared out so
    /// callers that need a one-off script run (the CLI's per-component
    /// extraction wiring) don't open a second console session against the
    /// same tmux pane.
    pub fn evaluator(&self) -> &EvaluatorClient {
        &self.evaluator
    }

    pub fn remote_temp_dir(&self) -> &str {
        &self.remote_temp_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves and caches the OpenProject id of the `"J2O Origin Key"`
    /// custom field. Every other operation in this store needs this id, so
    /// it's resolved lazily on first use and never again for the process.
    async fn origin_key_field_id(&self) -> Result<i64, ProvenanceError> {
        if let Some(id) = *self.origin_key_field_id.read().await {
            return Ok(id);
        }
        let result_path = self.result_path("field_id");
        let script = compose_resolve_custom_field_id(CF_ORIGIN_KEY, &result_path)?;
        let result = self
            .evaluator
            .execute(&script.full_source(), None, None, &result_path, self.timeout)
            .await?;
        let id = result
            .results
            .first()
            .and_then(|r| r.wp_id)
            .ok_or(ProvenanceError::OriginKeyFieldMissing)?;
        *self.origin_key_field_id.write().await = Some(id);
        Ok(id)
    }

    /// §4.4 `find_by_provenance`. Consults the in-memory cache first; a miss
    /// falls through to a live lookup script rather than assuming absence,
    /// since the cache is only ever warmed on demand.
    pub async fn find_by_provenance(
        &self,
        entity_type: &str,
        kind: SourceEntityKind,
        origin_key: &JiraKey,
    ) -> Result<Option<i64>, ProvenanceError> {
        if let Some(id) = self.caches.read().await.get(&kind).and_then(|c| c.get(origin_key)) {
            return Ok(Some(id));
        }

        let field_id = self.origin_key_field_id().await?;
        let result_path = self.result_path(&format!("find_{entity_type}"));
        let input_path = format!("{}/j2o_input_{entity_type}.json", self.remote_temp_dir);
        let composed = compose_find_by_provenance(
            entity_type,
            std::slice::from_ref(origin_key),
            field_id,
            &input_path,
            &result_path,
        )?;
        let result = self
            .evaluator
            .execute(
                &composed.script.full_source(),
                Some(&composed.input_payload),
                Some(&input_path),
                &result_path,
                self.timeout,
            )
            .await?;

        let target_id = result.results.first().and_then(|r| r.wp_id);
        if let Some(id) = target_id {
            self.caches
                .write()
                .await
                .entry(kind)
                .or_insert_with(MappingCache::new)
                .insert(origin_key.clone(), id);
        }
        debug!(entity_type, origin_key = %origin_key, found = target_id.is_some(), "find_by_provenance");
        Ok(target_id)
    }

    /// §4.4 `ensure_tagged`. Idempotent: the Ruby body skips any custom field
    /// whose value already matches, so calling this twice for the same
    /// record is safe.
    pub async fn ensure_tagged(
        &self,
        entity_type: &str,
        entries: &[TagBatchEntry],
    ) -> Result<(), ProvenanceError> {
        if entries.is_empty() {
            return Ok(());
        }
        let result_path = self.result_path(&format!("tag_{entity_type}"));
        let input_path = format!("{}/j2o_input_tag_{entity_type}.json", self.remote_temp_dir);
        let composed = compose_ensure_tagged(entity_type, entries, &input_path, &result_path)?;
        self.evaluator
            .execute(
                &composed.script.full_source(),
                Some(&composed.input_payload),
                Some(&input_path),
                &result_path,
                self.timeout,
            )
            .await?;
        Ok(())
    }

    /// §4.4 `build_mapping_cache`. Replaces whatever was cached for `kind`
    /// with a fresh scan of OpenProject — used to warm the cache before a
    /// component that will need heavy cross-referencing (e.g. work package
    /// content) or to recover after the process cache was lost.
    pub async fn build_mapping_cache(
        &self,
        entity_type: &str,
        kind: SourceEntityKind,
    ) -> Result<MappingCache, ProvenanceError> {
        let field_id = self.origin_key_field_id().await?;
        let result_path = self.result_path(&format!("cache_{entity_type}"));
        let script = compose_build_mapping_cache(entity_type, field_id, &result_path)?;
        let result = self
            .evaluator
            .execute(&script.full_source(), None, None, &result_path, self.timeout)
            .await?;

        let mut cache = MappingCache::new();
        for row in &result.results {
            if let (Some(jira_key), Some(target_id)) = (&row.jira_key, row.wp_id) {
                cache.insert(JiraKey::new(jira_key), target_id);
            }
        }
        debug!(entity_type, entries = cache.len(), "rebuilt mapping cache");
        self.caches.write().await.insert(kind, cache.clone());
        Ok(cache)
    }

    fn result_path(&self, label: &str) -> String {
        format!("{}/j2o_result_{label}.json", self.remote_temp_dir)
    }
}
