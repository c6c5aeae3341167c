use serde::{Deserialize, Serialize};

use crate::record::{Field, Record};

const PHONE_SEPARATORS: &[char] = &[' ', '-', '.', '(', ')', '/'];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    PossiblyInvalid,
    Normalized,
}

/// Advisory note attached to a field value. Never blocks a merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldAnnotation {
    pub field: Field,
    pub kind: AnnotationKind,
    pub message: String,
    /// Display form of the value, when it differs from the stored one.
    pub display: Option<String>,
}

/// Validates one incoming value. Email and phone are the only checked fields.
pub fn validate_value(field: Field, value: &str) -> Option<FieldAnnotation> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match field {
        Field::Email if !looks_like_email(value) => Some(FieldAnnotation {
            field,
            kind: AnnotationKind::PossiblyInvalid,
            message: format!("'{value}' is possibly invalid: expected name@domain.tld"),
            display: None,
        }),
        Field::Phone => {
            let normalized = normalize_phone(value);
            (normalized != value).then(|| FieldAnnotation {
                field,
                kind: AnnotationKind::Normalized,
                message: "Separators removed for display".to_string(),
                display: Some(normalized),
            })
        }
        _ => None,
    }
}

/// Annotations for every filled field of a record, in schema order.
pub fn annotate_record(record: &Record) -> Vec<FieldAnnotation> {
    record
        .iter()
        .filter_map(|(field, value)| validate_value(field, value))
        .collect()
}

/// Permissive syntactic check: one `@`, a non-empty local part, and a
/// domain with at least one dot and a non-empty last label.
pub fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Strips separator characters, keeping digits, a leading `+` and any
/// other character untouched.
pub fn normalize_phone(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !PHONE_SEPARATORS.contains(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails_pass() {
        assert!(looks_like_email("ana@x.com"));
        assert!(looks_like_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn test_invalid_emails_fail() {
        assert!(!looks_like_email("ana"));
        assert!(!looks_like_email("ana@localhost"));
        assert!(!looks_like_email("@x.com"));
        assert!(!looks_like_email("ana@x."));
        assert!(!looks_like_email("ana@@x.com"));
        assert!(!looks_like_email("ana li@x.com"));
    }

    #[test]
    fn test_invalid_email_is_flagged_not_rejected() {
        let note = validate_value(Field::Email, "not-an-email").unwrap();
        assert_eq!(note.kind, AnnotationKind::PossiblyInvalid);
        assert!(note.message.contains("possibly invalid"));
    }

    #[test]
    fn test_phone_separators_are_stripped_for_display() {
        assert_eq!(normalize_phone("+1 (555) 010-2030"), "+15550102030");
        let note = validate_value(Field::Phone, "555.010.2030").unwrap();
        assert_eq!(note.kind, AnnotationKind::Normalized);
        assert_eq!(note.display.as_deref(), Some("5550102030"));
    }

    #[test]
    fn test_already_normalized_phone_has_no_annotation() {
        assert!(validate_value(Field::Phone, "+15550102030").is_none());
    }

    #[test]
    fn test_other_fields_are_never_annotated() {
        assert!(validate_value(Field::Awards, "anything @ all").is_none());
        assert!(validate_value(Field::Email, "   ").is_none());
    }
}
