use thiserror::Error;

/// Interface-level error taxonomy for the Jira side (§7 "Transport"/"Protocol"
/// kinds apply here too, even though the wire format itself is out of scope).
#[derive(Error, Debug)]
pub enum JiraError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Jira returned {status} for {url}: {body}")]
    Api {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not parse Jira response body: {0}")]
    Decode(#[from] serde_json::Error),
}
