//! Applies a partial update onto the record.
//!
//! `merge_payload` is pure: it never mutates its input and returns the new
//! record together with what changed. Empty values never erase existing data;
//! only an explicit `UpdateValue::Clear` resets a field.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::validation::{validate_value, FieldAnnotation};
use crate::record::{Field, Record};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateValue {
    /// A value reported by the agent or an adapter. Empty means "still unknown".
    Set(String),
    /// Explicit request to reset the field to empty.
    Clear,
}

/// Partial mapping of record fields to new values, produced per turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePayload {
    entries: BTreeMap<Field, UpdateValue>,
}

impl UpdatePayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) -> &mut Self {
        self.entries.insert(field, UpdateValue::Set(value.into()));
        self
    }

    pub fn clear(&mut self, field: Field) -> &mut Self {
        self.entries.insert(field, UpdateValue::Clear);
        self
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    #[cfg(test)]
    pub fn get(&self, field: Field) -> Option<&UpdateValue> {
        self.entries.get(&field)
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &UpdateValue)> {
        self.entries.iter().map(|(f, v)| (*f, v))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub record: Record,
    pub changed: Vec<Field>,
    pub annotations: Vec<FieldAnnotation>,
}

/// Applies `payload` to `record`. Validation runs on incoming values before
/// they are stored; invalid values are still stored, only annotated.
pub fn merge_payload(record: &Record, payload: &UpdatePayload) -> MergeOutcome {
    let mut next = record.clone();
    let mut changed = Vec::new();
    let mut annotations = Vec::new();

    for (field, update) in payload.iter() {
        match update {
            UpdateValue::Set(value) => {
                if value.trim().is_empty() {
                    continue;
                }
                if let Some(note) = validate_value(field, value) {
                    annotations.push(note);
                }
                if next.get(field) != value.as_str() {
                    next.set(field, value.clone());
                    changed.push(field);
                }
            }
            UpdateValue::Clear => {
                if !next.get(field).is_empty() {
                    next.set(field, String::new());
                    changed.push(field);
                }
            }
        }
    }

    MergeOutcome {
        record: next,
        changed,
        annotations,
    }
}
