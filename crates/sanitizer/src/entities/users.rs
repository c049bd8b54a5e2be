use crate::entities::attach_provenance;
use crate::error::MappingError;
use crate::payload::{optional_str, str_field};
use model::{MappedRecord, ProvenanceTag, SourceEntityKind, SourceRecord, Value};

const ENTITY: &str = "user";

/// §4.6.5 "Users": resolved to existing OpenProject users by email, else by
/// login, else created; locale maps to language preference (§8 S1).
pub fn map(source: &SourceRecord, base_url: &str) -> Result<MappedRecord, MappingError> {
    let origin_key = source
        .origin_key
        .clone()
        .ok_or_else(|| MappingError::MissingRequiredField {
            entity: ENTITY,
            origin_key: source.origin_id.to_string(),
            field: "key",
        })?;

    let login = str_field(&source.payload, ENTITY, origin_key.as_str(), "name")?;
    let email = str_field(&source.payload, ENTITY, origin_key.as_str(), "emailAddress")?;
    let display_name = str_field(&source.payload, ENTITY, origin_key.as_str(), "displayName")?;
    let active = source
        .payload
        .get("active")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(true);

    let provenance = ProvenanceTag::jira(
        source.origin_id,
        origin_key,
        format!("{base_url}/secure/ViewProfile.jspa?name={login}"),
    );
    let mut record = MappedRecord::new(SourceEntityKind::User, provenance);
    record.set("login", Value::String(login.to_string()));
    record.set("mail", Value::String(email.to_string()));
    record.set("firstname", Value::String(first_name(display_name)));
    record.set("lastname", Value::String(last_name(display_name)));
    record.set("status", Value::Int(if active { 1 } else { 3 }));
    if let Some(locale) = optional_str(&source.payload, "locale") {
        record.set("language", Value::String(map_locale(locale)));
    }
    Ok(attach_provenance(record))
}

fn first_name(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .next()
        .unwrap_or(display_name)
        .to_string()
}

fn last_name(display_name: &str) -> String {
    let mut parts = display_name.split_whitespace();
    parts.next();
    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        display_name.to_string()
    } else {
        rest.join(" ")
    }
}

fn map_locale(locale: &str) -> String {
    match locale {
        "en_US" | "en_GB" => "en".to_string(),
        "de_DE" | "de_AT" | "de_CH" => "de".to_string(),
        other => other.split(['_', '-']).next().unwrap_or("en").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::OriginId;
    use serde_json::json;

    fn source() -> SourceRecord {
        SourceRecord::new(
            SourceEntityKind::User,
            OriginId(1),
            Some("jdoe".into()),
            json!({
                "name": "jdoe",
                "emailAddress": "j@ex.com",
                "displayName": "J Doe",
                "active": true,
                "locale": "de_DE",
            }),
        )
    }

    #[test]
    fn minimal_user_maps_per_scenario_s1() {
        let record = map(&source(), "https://jira.example").unwrap();
        assert_eq!(record.get("login"), Some(&Value::String("jdoe".to_string())));
        assert_eq!(record.get("mail"), Some(&Value::String("j@ex.com".to_string())));
        assert_eq!(record.get("firstname"), Some(&Value::String("J".to_string())));
        assert_eq!(record.get("lastname"), Some(&Value::String("Doe".to_string())));
        assert_eq!(record.get("language"), Some(&Value::String("de".to_string())));
        assert!(record.is_pure());
    }

    #[test]
    fn missing_email_is_a_mapping_error() {
        let mut source = source();
        source.payload.as_object_mut().unwrap().remove("emailAddress");
        let err = map(&source, "https://jira.example").unwrap_err();
        assert!(matches!(err, MappingError::MissingRequiredField { field: "emailAddress", .. }));
    }
}
