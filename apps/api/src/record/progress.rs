use serde::{Deserialize, Serialize};

use crate::record::{Field, FieldGroup, Record};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupProgress {
    pub group: String,
    pub filled: usize,
    pub total: usize,
}

/// Display-only collection progress. The controller never uses this to
/// decide whether the conversation is over; the agent declares that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionProgress {
    pub filled: usize,
    pub total: usize,
    pub ratio: f64,
    pub groups: Vec<GroupProgress>,
    pub missing: Vec<Field>,
}

pub fn compute_progress(record: &Record) -> CollectionProgress {
    let total = record.len();
    let missing: Vec<Field> = record
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(f, _)| f)
        .collect();
    let filled = total - missing.len();

    let groups = FieldGroup::ALL
        .into_iter()
        .map(|group| {
            let fields: Vec<_> = Field::ALL.iter().filter(|f| f.group() == group).collect();
            GroupProgress {
                group: group.as_str().to_string(),
                filled: fields.iter().filter(|f| record.is_filled(***f)).count(),
                total: fields.len(),
            }
        })
        .collect();

    let ratio = if total > 0 {
        (filled as f64 / total as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };

    CollectionProgress {
        filled,
        total,
        ratio,
        groups,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::merge::{merge_payload, UpdatePayload};

    #[test]
    fn test_empty_record_is_all_missing() {
        let report = compute_progress(&Record::new());
        assert_eq!(report.filled, 0);
        assert_eq!(report.total, 19);
        assert_eq!(report.missing.len(), 19);
        assert_eq!(report.ratio, 0.0);
    }

    #[test]
    fn test_group_counts_follow_filled_fields() {
        let record = merge_payload(
            &Record::new(),
            &UpdatePayload::new()
                .with(Field::FirstName, "Ana")
                .with(Field::Awards, "Best paper 2021"),
        )
        .record;
        let report = compute_progress(&record);
        assert_eq!(report.filled, 2);
        let basic = report
            .groups
            .iter()
            .find(|g| g.group == "basic_information")
            .unwrap();
        assert_eq!((basic.filled, basic.total), (1, 4));
        assert!(!report.missing.contains(&Field::Awards));
    }
}
