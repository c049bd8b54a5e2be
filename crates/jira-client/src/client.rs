use crate::error::JiraError;
use crate::pagination::IssuePage;
use base64::Engine;
use base64::engine::general_purpose;
use reqwest::Client;
use tracing::{debug, warn};

/// Interface-level Jira Server 9.x client (§1: "specified at the interface
/// level only; their wire formats are external"). Every method returns raw
/// `serde_json::Value` payloads — interpreting them is the sanitizer's job,
/// never this client's (§3.1 "payload is the entity's JSON exactly as the
/// Jira client returned it").
#[derive(Debug, Clone)]
pub struct JiraClient {
    base_url: String,
    http: Client,
    auth_header: String,
}

impl JiraClient {
    pub fn new(base_url: impl Into<String>, username: &str, api_token: &str) -> Self {
        let credentials = format!("{username}:{api_token}");
        let encoded = general_purpose::STANDARD.encode(credentials);
        JiraClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            auth_header: format!("Basic {encoded}"),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<serde_json::Value, JiraError> {
        let url = format!("{}{path}", self.base_url);
        debug!(url, "GET");
        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.auth_header)
            .query(query)
            .send()
            .await
            .map_err(|source| JiraError::Request { url: url.clone(), source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url, %status, "Jira returned an error response");
            return Err(JiraError::Api { url, status, body });
        }

        let body = response.bytes().await.map_err(|source| JiraError::Request { url: url.clone(), source })?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Downloads an attachment's raw bytes from its Jira-provided content URL
    /// (§4.6.5 "Attachments"). Auth header is the same basic-auth credential
    /// used for the REST API; Jira Server serves attachment content behind
    /// the same auth.
    pub async fn download(&self, content_url: &str) -> Result<Vec<u8>, JiraError> {
        let response = self
            .http
            .get(content_url)
            .header("Authorization", &self.auth_header)
            .send()
            .await
            .map_err(|source| JiraError::Request {
                url: content_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Api {
                url: content_url.to_string(),
                status,
                body,
            });
        }

        Ok(response
            .bytes()
            .await
            .map_err(|source| JiraError::Request {
                url: content_url.to_string(),
                source,
            })?
            .to_vec())
    }

    /// One page of `/rest/api/2/search` (Jira Server 9.x; the v3 endpoint is
    /// Cloud-only). `expand` typically includes `"changelog"` for the
    /// work-package content phase (§4.6.3).
    pub async fn search_issues(
        &self,
        jql: &str,
        start_at: u32,
        max_results: u32,
        expand: &[&str],
    ) -> Result<IssuePage, JiraError> {
        let start_at = start_at.to_string();
        let max_results = max_results.to_string();
        let expand = expand.join(",");
        let query = [("jql", jql), ("startAt", start_at.as_str()), ("maxResults", max_results.as_str()), ("expand", expand.as_str())];
        let body = self.get_json("/rest/api/2/search", &query).await?;
        IssuePage::from_response(body)
    }

    /// Drives `search_issues` to exhaustion, one page at a time. Callers that
    /// need checkpointed resumption (§4.5 `resume_token`) should call
    /// `search_issues` directly instead and persist `start_at` themselves.
    pub async fn fetch_all_issues(&self, jql: &str, page_size: u32, expand: &[&str]) -> Result<Vec<serde_json::Value>, JiraError> {
        let mut all = Vec::new();
        let mut start_at = 0;
        loop {
            let page = self.search_issues(jql, start_at, page_size, expand).await?;
            let fetched = page.issues.len() as u32;
            all.extend(page.issues);
            start_at += fetched;
            if fetched == 0 || start_at >= page.total {
                break;
            }
        }
        Ok(all)
    }

    pub async fn list_users(&self, max_results: u32) -> Result<Vec<serde_json::Value>, JiraError> {
        let max_results = max_results.to_string();
        let query = [("username", "."), ("maxResults", max_results.as_str())];
        let body = self.get_json("/rest/api/2/user/search", &query).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_groups(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/groups/picker", &[]).await?;
        Ok(body.get("groups").and_then(|g| g.as_array()).cloned().unwrap_or_default())
    }

    pub async fn list_projects(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/project", &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_custom_fields(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/field", &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_issue_types(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/issuetype", &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_statuses(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/status", &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_priorities(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/priority", &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_workflows(&self) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json("/rest/api/2/workflow", &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_project_versions(&self, project_key: &str) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json(&format!("/rest/api/2/project/{project_key}/versions"), &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_project_components(&self, project_key: &str) -> Result<Vec<serde_json::Value>, JiraError> {
        let body = self.get_json(&format!("/rest/api/2/project/{project_key}/components"), &[]).await?;
        Ok(body.as_array().cloned().unwrap_or_default())
    }

    pub async fn list_labels(&self, max_results: u32) -> Result<Vec<serde_json::Value>, JiraError> {
        let max_results = max_results.to_string();
        let query = [("maxResults", max_results.as_str())];
        let body = self.get_json("/rest/api/2/label", &query).await?;
        Ok(body.get("values").and_then(|v| v.as_array()).cloned().unwrap_or_default())
    }
}
