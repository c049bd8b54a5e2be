use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("no body template registered for component {0:?}")]
    UnknownComponent(String),
    #[error("failed to serialize input payload: {0}")]
    Serialize(String),
}
