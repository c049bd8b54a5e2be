use model::SourceEntityKind;
use thiserror::Error;

/// Raised by a `map` function when a source record can't be turned into a
/// valid [`model::MappedRecord`] (§4.3 rule 4). Never retried by the caller —
/// a mapping failure means the source data itself is incomplete, not that
/// something transient went wrong.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("{entity} {origin_key}: missing required field {field}")]
    MissingRequiredField {
        entity: &'static str,
        origin_key: String,
        field: &'static str,
    },

    #[error("{entity} {origin_key}: reference to {target_kind:?} {target_key} has not been migrated yet")]
    UnresolvedLink {
        entity: &'static str,
        origin_key: String,
        target_kind: SourceEntityKind,
        target_key: String,
    },

    #[error("{entity} {origin_key}: {detail}")]
    MalformedPayload {
        entity: &'static str,
        origin_key: String,
        detail: String,
    },
}
