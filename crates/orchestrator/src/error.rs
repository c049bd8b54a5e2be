use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("another migration is already running against this target (lock held at {0})")]
    LockHeld(String),

    #[error("could not acquire migration lock at {path}: {source}")]
    LockIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Migration(#[from] migrations::MigrationError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(String),

    #[error("unknown component {0} named in filter or override order")]
    UnknownComponent(String),
}
