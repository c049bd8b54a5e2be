use crate::state::{
    StateStore,
    models::{Checkpoint, WalEntry},
};
use async_trait::async_trait;
use model::{ComponentName, RunId};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::{error::Error, path::Path};

/// `StateStore` backed by an embedded `sled` database (§4.5: "a small
/// key-value store (durable file or embedded SQL store)"). `save_checkpoint`
/// uses a sled transaction to make the check-then-set race-free: a racing
/// write for an already-superseded batch is silently skipped rather than
/// clobbering the newer state.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn chk_key(run_id: &RunId, component: &ComponentName) -> String {
        format!("chk:{}:{}", run_id, component)
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<(), Box<dyn Error + Send + Sync>> {
        let key = Self::chk_key(&cp.run_id, &cp.component);
        let new_bytes = bincode::serialize(cp)?;

        let result = self
            .db
            .transaction::<_, _, Box<dyn Error + Send + Sync>>(|tx_db| {
                if let Some(existing_bytes) = tx_db.get(&key)? {
                    let existing: Checkpoint = bincode::deserialize(&existing_bytes)
                        .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;

                    if !existing.accepts(cp.last_completed_batch_index, cp.stage) {
                        return Ok(());
                    }
                }

                tx_db.insert(&*key, new_bytes.as_slice())?;
                Ok(())
            });

        match result {
            Ok(_) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Box::new(e)),
        }
    }

    async fn load_checkpoint(
        &self,
        run_id: &RunId,
        component: &ComponentName,
    ) -> Result<Option<Checkpoint>, Box<dyn Error + Send + Sync>> {
        let key = Self::chk_key(run_id, component);
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn reset(
        &self,
        run_id: &RunId,
        component: &ComponentName,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let key = Self::chk_key(run_id, component);
        self.db.remove(key)?;
        Ok(())
    }

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), Box<dyn Error + Send + Sync>> {
        let seq = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let key = format!("wal:{}:{}", entry.run_id(), seq);
        let value = bincode::serialize(entry)?;

        self.db.insert(key, value)?;
        Ok(())
    }

    async fn iter_wal(&self, run_id: &RunId) -> Result<Vec<WalEntry>, Box<dyn Error + Send + Sync>> {
        let prefix = format!("wal:{}:", run_id);
        let mut entries = Vec::new();

        for item in self.db.scan_prefix(prefix) {
            let (_key, value) = item?;
            let entry: WalEntry = bincode::deserialize(&value)?;
            entries.push(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::models::CheckpointStage;
    use model::BatchIndex;
    use tempfile::tempdir;

    fn mk_cp(stage: CheckpointStage, batch_index: u64) -> Checkpoint {
        Checkpoint {
            run_id: RunId::new("run"),
            component: ComponentName::new("issues"),
            stage,
            last_completed_batch_index: Some(BatchIndex(batch_index)),
            resume_token: None,
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn keeps_uncommitted_write_over_future_read() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store
            .save_checkpoint(&mk_cp(CheckpointStage::Write, 1))
            .await
            .unwrap();

        // Producer races ahead with a read for the next batch, but we should
        // not advance past the uncommitted write.
        store
            .save_checkpoint(&mk_cp(CheckpointStage::Read, 2))
            .await
            .unwrap();

        let cp = store
            .load_checkpoint(&RunId::new("run"), &ComponentName::new("issues"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cp.stage, CheckpointStage::Write);
        assert_eq!(cp.last_completed_batch_index, Some(BatchIndex(1)));
    }

    #[tokio::test]
    async fn advances_after_commit() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();

        store
            .save_checkpoint(&mk_cp(CheckpointStage::Committed, 1))
            .await
            .unwrap();

        store
            .save_checkpoint(&mk_cp(CheckpointStage::Read, 2))
            .await
            .unwrap();

        let cp = store
            .load_checkpoint(&RunId::new("run"), &ComponentName::new("issues"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cp.stage, CheckpointStage::Read);
        assert_eq!(cp.last_completed_batch_index, Some(BatchIndex(2)));
    }

    #[tokio::test]
    async fn reset_clears_checkpoint() {
        let dir = tempdir().unwrap();
        let store = SledStateStore::open(dir.path()).unwrap();
        let run_id = RunId::new("run");
        let component = ComponentName::new("issues");

        store
            .save_checkpoint(&mk_cp(CheckpointStage::Committed, 1))
            .await
            .unwrap();
        store.reset(&run_id, &component).await.unwrap();

        assert!(
            store
                .load_checkpoint(&run_id, &component)
                .await
                .unwrap()
                .is_none()
        );
    }
}
