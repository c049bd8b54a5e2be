use thiserror::Error;

/// Interface-level error taxonomy for the OpenProject REST side. Bulk writes
/// never go through this client (§1: the REST API "cannot express the
/// required bulk operations, bypass validations, or set immutable fields") —
/// it exists only for read-only lookups and reachability checks.
#[derive(Error, Debug)]
pub enum OpenProjectError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenProject returned {status} for {url}: {body}")]
    Api {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not parse OpenProject response body: {0}")]
    Decode(#[from] serde_json::Error),
}
