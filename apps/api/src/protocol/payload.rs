// Decoding of the update region body into an UpdatePayload.

use serde_json::{Map, Value};

use crate::llm_client::strip_json_fences;
use crate::protocol::{ProtocolIssue, CLEAR_SENTINEL};
use crate::record::merge::UpdatePayload;
use crate::record::{Field, FieldGroup};

#[derive(Debug)]
pub struct DecodedPayload {
    pub payload: UpdatePayload,
    pub issues: Vec<ProtocolIssue>,
}

/// Decodes a flat `{field: "value"}` object. Objects nested one level under
/// a group name (`basic_information`, `eb1a_criteria`, ...) are flattened.
/// Structural failures return `MalformedUpdatePayload`; per-key problems are
/// collected as issues and the key is skipped.
pub fn decode_update_body(body: &str) -> Result<DecodedPayload, ProtocolIssue> {
    let body = strip_json_fences(body);
    let mut decoded = DecodedPayload {
        payload: UpdatePayload::new(),
        issues: Vec::new(),
    };
    if body.is_empty() {
        return Ok(decoded);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ProtocolIssue::MalformedUpdatePayload(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ProtocolIssue::MalformedUpdatePayload(format!(
            "expected a JSON object, found {}",
            json_kind(&value)
        )));
    };

    for (key, value) in &map {
        match value {
            Value::Object(inner) if FieldGroup::from_key(key).is_some() => {
                decode_entries(inner, &mut decoded);
            }
            _ => decode_entry(key, value, &mut decoded),
        }
    }
    Ok(decoded)
}

fn decode_entries(map: &Map<String, Value>, decoded: &mut DecodedPayload) {
    for (key, value) in map {
        decode_entry(key, value, decoded);
    }
}

fn decode_entry(key: &str, value: &Value, decoded: &mut DecodedPayload) {
    let Some(field) = Field::from_key(key) else {
        decoded
            .issues
            .push(ProtocolIssue::UnknownField(key.to_string()));
        return;
    };
    match value {
        Value::String(s) if s.trim() == CLEAR_SENTINEL => {
            decoded.payload.clear(field);
        }
        Value::String(s) => {
            decoded.payload.set(field, s.as_str());
        }
        // null is "still unknown", same as ""
        Value::Null => {}
        _ => decoded
            .issues
            .push(ProtocolIssue::NonStringValue(key.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::merge::UpdateValue;

    #[test]
    fn test_flat_object_decodes() {
        let decoded = decode_update_body(r#"{"industry": "AI", "job_title": ""}"#).unwrap();
        assert_eq!(decoded.payload.len(), 2);
        assert_eq!(
            decoded.payload.get(Field::JobTitle),
            Some(&UpdateValue::Set(String::new()))
        );
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_grouped_shape_is_flattened() {
        let body = r#"{
            "basic_information": {"first_name": "John", "email": ""},
            "eb1a_criteria": {"awards_description": "IEEE Fellow"},
            "supporting_documents": {"resume_file": ""}
        }"#;
        let decoded = decode_update_body(body).unwrap();
        assert_eq!(
            decoded.payload.get(Field::FirstName),
            Some(&UpdateValue::Set("John".to_string()))
        );
        assert_eq!(
            decoded.payload.get(Field::Awards),
            Some(&UpdateValue::Set("IEEE Fellow".to_string()))
        );
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_clear_sentinel_becomes_clear() {
        let decoded = decode_update_body(r#"{"phone": "__clear__"}"#).unwrap();
        assert_eq!(decoded.payload.get(Field::Phone), Some(&UpdateValue::Clear));
    }

    #[test]
    fn test_null_is_skipped_silently() {
        let decoded = decode_update_body(r#"{"phone": null}"#).unwrap();
        assert!(decoded.payload.is_empty());
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn test_non_string_values_are_dropped_with_issue() {
        let decoded =
            decode_update_body(r#"{"high_salary": 250000, "awards": ["a", "b"]}"#).unwrap();
        assert!(decoded.payload.is_empty());
        assert_eq!(decoded.issues.len(), 2);
    }

    #[test]
    fn test_array_body_is_malformed() {
        let err = decode_update_body(r#"["first_name", "Ana"]"#).unwrap_err();
        assert!(matches!(err, ProtocolIssue::MalformedUpdatePayload(m) if m.contains("array")));
    }

    #[test]
    fn test_empty_body_is_empty_payload() {
        let decoded = decode_update_body("  \n ").unwrap();
        assert!(decoded.payload.is_empty());
    }
}
