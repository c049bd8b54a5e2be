use crate::error::OpenProjectError;
use reqwest::Client;
use tracing::debug;

/// Read-only OpenProject v3 REST client (§1, §6). Everything that creates or
/// mutates target entities goes through the Rails evaluator (L1) instead —
/// this client covers only the handful of lookups the orchestrator needs
/// before or alongside a run: target reachability, and cross-checking
/// configuration (custom field ids, statuses) against what the evaluator
/// reports.
#[derive(Debug, Clone)]
pub struct OpenProjectClient {
    base_url: String,
    http: Client,
    api_key: String,
}

impl OpenProjectClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        OpenProjectClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            api_key: api_key.into(),
        }
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, OpenProjectError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url, "GET");
        let response = self
            .http
            .get(&url)
            .basic_auth("apikey", Some(&self.api_key))
            .send()
            .await
            .map_err(|source| OpenProjectError::Request { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OpenProjectError::Api { url, status, body });
        }

        let body = response.bytes().await.map_err(|source| OpenProjectError::Request { url: url.clone(), source })?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Confirms the target instance is reachable and authenticated before an
    /// orchestrator run starts (§4.7 implies this happens before dispatch;
    /// the evaluator's own setup cost makes discovering auth failures here
    /// cheaper than discovering them mid-run).
    pub async fn health_check(&self) -> Result<(), OpenProjectError> {
        self.get_json("/api/v3/").await.map(|_| ())
    }

    /// Lists custom fields as OpenProject's REST API sees them — used to
    /// sanity-check that the provenance fields the evaluator expects
    /// (`"J2O Origin Key"` etc.) are actually defined (§4.4).
    pub async fn list_custom_fields(&self) -> Result<Vec<serde_json::Value>, OpenProjectError> {
        let body = self.get_json("/api/v3/custom_fields").await?;
        Ok(body
            .get("_embedded")
            .and_then(|e| e.get("elements"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    pub async fn list_statuses(&self) -> Result<Vec<serde_json::Value>, OpenProjectError> {
        let body = self.get_json("/api/v3/statuses").await?;
        Ok(body
            .get("_embedded")
            .and_then(|e| e.get("elements"))
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }
}
