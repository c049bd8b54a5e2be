use crate::error::MappingError;
use serde_json::Value as Json;

/// A required string field, whitelisted by name (§4.3 rule 1/4).
pub fn str_field<'a>(
    payload: &'a Json,
    entity: &'static str,
    origin_key: &str,
    field: &'static str,
) -> Result<&'a str, MappingError> {
    payload
        .get(field)
        .and_then(Json::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity,
            origin_key: origin_key.to_string(),
            field,
        })
}

pub fn optional_str<'a>(payload: &'a Json, field: &str) -> Option<&'a str> {
    payload.get(field).and_then(Json::as_str)
}

pub fn optional_bool(payload: &Json, field: &str) -> Option<bool> {
    payload.get(field).and_then(Json::as_bool)
}

pub fn optional_f64(payload: &Json, field: &str) -> Option<f64> {
    payload.get(field).and_then(Json::as_f64)
}

/// Extracts the trailing numeric path segment from a Jira link object
/// (`{"self": ".../issuetype/5"}` or `{"href": "..."}`) per §4.3 rule 3.
pub fn href_tail_id(link: &Json) -> Option<i64> {
    let href = link.get("href").or_else(|| link.get("self"))?.as_str()?;
    href.rsplit('/').find(|s| !s.is_empty())?.parse().ok()
}

/// Walks a dotted path of object keys, e.g. `nested(fields, &["project", "key"])`.
pub fn nested<'a>(payload: &'a Json, path: &[&str]) -> Option<&'a Json> {
    let mut cur = payload;
    for segment in path {
        cur = cur.get(segment)?;
    }
    Some(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_the_trailing_id_from_a_self_link() {
        let link = json!({ "self": "https://jira.example/rest/api/2/issuetype/5" });
        assert_eq!(href_tail_id(&link), Some(5));
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let payload = json!({});
        let err = str_field(&payload, "user", "jdoe", "emailAddress").unwrap_err();
        assert!(matches!(err, MappingError::MissingRequiredField { .. }));
    }
}
