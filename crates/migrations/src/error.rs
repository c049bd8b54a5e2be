use thiserror::Error;

/// Everything a component's Extract/Map/Load cycle (§4.6.1) can fail with.
/// Grouped by kind per §7, not by originating type — callers match on the
/// variant to decide retry vs. fatal vs. "record to the error channel and
/// continue".
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error(transparent)]
    Mapping(#[from] sanitizer::MappingError),

    #[error(transparent)]
    Compose(#[from] script_composer::ComposerError),

    #[error(transparent)]
    Evaluate(#[from] remote_exec::EvaluatorError),

    #[error(transparent)]
    Provenance(#[from] provenance::ProvenanceError),

    #[error(transparent)]
    Extract(#[from] jira_client::JiraError),

    #[error("component {0} requires an existing work-package mapping and none was found")]
    MissingWorkPackageMapping(String),

    #[error("unknown component {0} in dependency graph")]
    UnknownComponent(String),

    #[error("checkpoint store error: {0}")]
    Checkpoint(String),

    #[error("attachment download task panicked: {0}")]
    TaskJoin(String),
}
