use crate::error::JiraError;

/// One page of `/rest/api/2/search` results. Jira Server's search response
/// always carries `startAt`/`maxResults`/`total` alongside `issues`, letting
/// a caller decide whether another page is needed without a separate count
/// request.
#[derive(Debug, Clone)]
pub struct IssuePage {
    pub issues: Vec<serde_json::Value>,
    pub start_at: u32,
    pub max_results: u32,
    pub total: u32,
}

impl IssuePage {
    pub fn from_response(body: serde_json::Value) -> Result<Self, JiraError> {
        let issues = body.get("issues").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        let start_at = body.get("startAt").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let max_results = body.get("maxResults").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let total = body.get("total").and_then(|v| v.as_u64()).unwrap_or(issues.len() as u64) as u32;
        Ok(IssuePage {
            issues,
            start_at,
            max_results,
            total,
        })
    }

    pub fn is_last_page(&self) -> bool {
        self.start_at + (self.issues.len() as u32) >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_paging_fields_from_a_search_response() {
        let body = json!({
            "startAt": 0,
            "maxResults": 50,
            "total": 120,
            "issues": [{"key": "NRS-1"}, {"key": "NRS-2"}],
        });
        let page = IssuePage::from_response(body).unwrap();
        assert_eq!(page.issues.len(), 2);
        assert_eq!(page.total, 120);
        assert!(!page.is_last_page());
    }

    #[test]
    fn an_empty_final_page_reports_itself_as_last() {
        let body = json!({"startAt": 120, "maxResults": 50, "total": 120, "issues": []});
        let page = IssuePage::from_response(body).unwrap();
        assert!(page.is_last_page());
    }
}
