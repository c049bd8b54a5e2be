use thiserror::Error;

/// Everything an L4 provenance operation (§4.4 `find_by_provenance`,
/// `ensure_tagged`, `build_mapping_cache`) can fail with.
#[derive(Error, Debug)]
pub enum ProvenanceError {
    #[error(transparent)]
    Compose(#[from] script_composer::ComposerError),

    #[error(transparent)]
    Evaluate(#[from] remote_exec::EvaluatorError),

    #[error("\"J2O Origin Key\" custom field is not defined on the target instance")]
    OriginKeyFieldMissing,

    #[error("result row for {jira_key} did not come back from the evaluator")]
    MissingResultRow { jira_key: String },
}
