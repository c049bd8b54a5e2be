use thiserror::Error;

/// Failure modes for [`crate::state::StateStore`] implementations (§0.2).
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("failed to save checkpoint: {0}")]
    SaveCheckpoint(String),

    #[error("failed to load checkpoint: {0}")]
    LoadCheckpoint(String),

    #[error("failed to reset checkpoint: {0}")]
    Reset(String),

    #[error("failed to append WAL entry: {0}")]
    AppendWal(String),

    #[error("failed to iterate WAL entries: {0}")]
    IterateWal(String),
}

/// Failure modes for [`crate::progress::ProgressService`] queries.
#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("failed to read WAL: {0}")]
    Wal(String),

    #[error("failed to load checkpoint: {0}")]
    LoadCheckpoint(String),
}
