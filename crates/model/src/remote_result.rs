use serde::{Deserialize, Serialize};

/// One row of the `results` array in a [`RemoteResult`] (§6, "Wire
/// formats"). Field names and shape are bit-precise: the evaluator's Ruby
/// body emits exactly this JSON shape between the sentinel markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResultRow {
    pub wp_id: Option<i64>,
    pub jira_key: Option<String>,
    pub created: i64,
    pub error: Option<String>,
}

/// `{status, created_ids[], errors[], raw_console_bytes}` deserialized from
/// a result file written by the remote evaluator (§3.1). `results` carries
/// the bit-precise wire format from §6; `status`/`raw_console_bytes` are the
/// evaluator client's own bookkeeping around that payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteResult {
    pub status: RemoteResultStatus,
    pub results: Vec<RemoteResultRow>,
    pub raw_console_bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteResultStatus {
    Ok,
    PartialFailure,
    Failed,
}

impl RemoteResult {
    pub fn created_ids(&self) -> Vec<i64> {
        self.results.iter().filter_map(|r| r.wp_id).collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_deref())
            .collect()
    }

    /// Parses the JSON found between `JSON_OUTPUT_START` / `JSON_OUTPUT_END`
    /// sentinel markers (§4.1 step 6), attaching the raw console bytes for
    /// diagnostics regardless of parse outcome.
    pub fn from_sentinel_framed(console_bytes: &[u8]) -> Result<Self, ResultParseError> {
        const START: &str = "JSON_OUTPUT_START";
        const END: &str = "JSON_OUTPUT_END";

        let text = String::from_utf8_lossy(console_bytes);
        let start = text.find(START).ok_or(ResultParseError::MissingSentinel)?;
        let after_start = start + START.len();
        let end = text[after_start..]
            .find(END)
            .map(|p| after_start + p)
            .ok_or(ResultParseError::MissingSentinel)?;
        let json_slice = text[after_start..end].trim();

        #[derive(Deserialize)]
        struct Wire {
            results: Vec<RemoteResultRow>,
        }
        let wire: Wire =
            serde_json::from_str(json_slice).map_err(|e| ResultParseError::Json(e.to_string()))?;

        let status = if wire.results.is_empty() {
            RemoteResultStatus::Ok
        } else if wire.results.iter().all(|r| r.error.is_none()) {
            RemoteResultStatus::Ok
        } else if wire.results.iter().all(|r| r.error.is_some()) {
            RemoteResultStatus::Failed
        } else {
            RemoteResultStatus::PartialFailure
        };

        Ok(RemoteResult {
            status,
            results: wire.results,
            raw_console_bytes: console_bytes.to_vec(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResultParseError {
    #[error("sentinel markers not found in console output")]
    MissingSentinel,
    #[error("failed to parse result JSON: {0}")]
    Json(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_framed_json_between_sentinels() {
        let bytes = b"noise before\nJSON_OUTPUT_START\n{\"results\":[{\"wp_id\":42,\"jira_key\":\"A-1\",\"created\":1,\"error\":null}]}\nJSON_OUTPUT_END\nnoise after";
        let result = RemoteResult::from_sentinel_framed(bytes).unwrap();
        assert_eq!(result.status, RemoteResultStatus::Ok);
        assert_eq!(result.created_ids(), vec![42]);
    }

    #[test]
    fn missing_sentinels_is_a_parse_error() {
        let bytes = b"no markers here at all";
        let err = RemoteResult::from_sentinel_framed(bytes).unwrap_err();
        assert!(matches!(err, ResultParseError::MissingSentinel));
    }

    #[test]
    fn mixed_errors_yield_partial_failure() {
        let bytes = b"JSON_OUTPUT_START{\"results\":[{\"wp_id\":1,\"jira_key\":\"A-1\",\"created\":1,\"error\":null},{\"wp_id\":null,\"jira_key\":\"A-2\",\"created\":0,\"error\":\"validation failed\"}]}JSON_OUTPUT_END";
        let result = RemoteResult::from_sentinel_framed(bytes).unwrap();
        assert_eq!(result.status, RemoteResultStatus::PartialFailure);
    }
}
