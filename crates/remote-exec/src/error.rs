use thiserror::Error;

/// SSH connection/transport failure (§4.1 failure model). Fatal for the
/// current batch; the orchestrator may retry with backoff.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: russh::Error,
    },

    #[error("authentication failed for {user}@{host}")]
    AuthFailed { host: String, user: String },

    #[error("ssh command failed: {0}")]
    Command(String),

    #[error("file transfer failed: {0}")]
    Transfer(String),

    #[error("connection lost: {0}")]
    ConnectionLost(String),
}

/// Container-level failure: the target container isn't running or `docker
/// exec`/`docker cp` itself failed (§4.1).
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("container {0} is not running")]
    NotRunning(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The console session's prompt could not be detected in time (§4.1: "the
/// console session … responsible for … prompt detection with adaptive
/// polling"). Triggers one stabilization attempt before surfacing.
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("prompt not detected within {0:?}")]
    NotReady(std::time::Duration),

    #[error("evaluation timed out after {timeout:?}")]
    Timeout {
        timeout: std::time::Duration,
        last_captured: Vec<u8>,
    },

    #[error(transparent)]
    Container(#[from] ContainerError),
}

/// The Ruby evaluator itself raised (ActiveRecord validation, a DB
/// constraint, …). Never retried (§4.1, §7).
#[derive(Error, Debug)]
#[error("script execution failed: {message}")]
pub struct ScriptExecutionError {
    pub message: String,
    pub console_bytes: Vec<u8>,
}

/// The union of everything an `EvaluatorClient::execute` call can fail with
/// (§0.2: `EvaluatorError`).
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Script(#[from] ScriptExecutionError),

    #[error(transparent)]
    ResultParse(#[from] model::ResultParseError),
}
