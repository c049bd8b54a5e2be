use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file as YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to serialize JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not load SSH private key from {path}: {source}")]
    SshKey {
        path: String,
        #[source]
        source: russh_keys::Error,
    },

    #[error(transparent)]
    Transport(#[from] remote_exec::TransportError),

    #[error(transparent)]
    Evaluator(#[from] remote_exec::EvaluatorError),

    #[error(transparent)]
    Jira(#[from] jira_client::JiraError),

    #[error(transparent)]
    OpenProject(#[from] openproject_client::OpenProjectError),

    #[error(transparent)]
    Orchestrator(#[from] orchestrator::OrchestratorError),

    #[error("checkpoint store error: {0}")]
    Checkpoint(String),

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error("migration run finished with one or more failed components")]
    RunFailed,
}
