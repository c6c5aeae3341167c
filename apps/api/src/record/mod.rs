// Case record: the fixed-schema data collected across a session.
// Values only ever change through `merge::merge_payload`.

pub mod merge;
pub mod progress;
pub mod validation;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the fixed record fields. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    VisaInterest,
    Industry,
    JobTitle,
    Awards,
    AssociationMembership,
    PublishedMaterial,
    JudgingWork,
    OriginalContributions,
    ScholarlyArticles,
    ArtisticShowcases,
    LeadingRole,
    HighSalary,
    CommercialSuccess,
    LinkedinUrl,
    ResumeFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    BasicInformation,
    VisaAndRole,
    Eb1aCriteria,
    SupportingDocuments,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 4] = [
        FieldGroup::BasicInformation,
        FieldGroup::VisaAndRole,
        FieldGroup::Eb1aCriteria,
        FieldGroup::SupportingDocuments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldGroup::BasicInformation => "basic_information",
            FieldGroup::VisaAndRole => "visa_and_role",
            FieldGroup::Eb1aCriteria => "eb1a_criteria",
            FieldGroup::SupportingDocuments => "supporting_documents",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == key)
    }
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::Phone,
        Field::VisaInterest,
        Field::Industry,
        Field::JobTitle,
        Field::Awards,
        Field::AssociationMembership,
        Field::PublishedMaterial,
        Field::JudgingWork,
        Field::OriginalContributions,
        Field::ScholarlyArticles,
        Field::ArtisticShowcases,
        Field::LeadingRole,
        Field::HighSalary,
        Field::CommercialSuccess,
        Field::LinkedinUrl,
        Field::ResumeFile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::VisaInterest => "visa_interest",
            Field::Industry => "industry",
            Field::JobTitle => "job_title",
            Field::Awards => "awards",
            Field::AssociationMembership => "association_membership",
            Field::PublishedMaterial => "published_material",
            Field::JudgingWork => "judging_work",
            Field::OriginalContributions => "original_contributions",
            Field::ScholarlyArticles => "scholarly_articles",
            Field::ArtisticShowcases => "artistic_showcases",
            Field::LeadingRole => "leading_role",
            Field::HighSalary => "high_salary",
            Field::CommercialSuccess => "commercial_success",
            Field::LinkedinUrl => "linkedin_url",
            Field::ResumeFile => "resume_file",
        }
    }

    pub fn group(&self) -> FieldGroup {
        match self {
            Field::FirstName | Field::LastName | Field::Email | Field::Phone => {
                FieldGroup::BasicInformation
            }
            Field::VisaInterest | Field::Industry | Field::JobTitle => FieldGroup::VisaAndRole,
            Field::LinkedinUrl | Field::ResumeFile => FieldGroup::SupportingDocuments,
            _ => FieldGroup::Eb1aCriteria,
        }
    }

    /// Human description, rendered into the system instruction.
    pub fn description(&self) -> &'static str {
        match self {
            Field::FirstName => "Applicant's first name",
            Field::LastName => "Applicant's last name",
            Field::Email => "Applicant's email address",
            Field::Phone => "Applicant's phone number",
            Field::VisaInterest => "Visa category of interest",
            Field::Industry => "Applicant's primary industry",
            Field::JobTitle => "Applicant's current job title",
            Field::Awards => "Nationally or internationally recognized prizes or awards",
            Field::AssociationMembership => {
                "Membership in associations requiring outstanding achievements"
            }
            Field::PublishedMaterial => "Published material about the applicant in major media",
            Field::JudgingWork => "Participation as a judge of the work of others",
            Field::OriginalContributions => "Original contributions of major significance",
            Field::ScholarlyArticles => "Authorship of scholarly articles",
            Field::ArtisticShowcases => "Display of work at artistic exhibitions or showcases",
            Field::LeadingRole => {
                "Leading or critical role in distinguished organizations"
            }
            Field::HighSalary => "High salary or remuneration relative to others in the field",
            Field::CommercialSuccess => "Commercial successes in the performing arts",
            Field::LinkedinUrl => "URL of the applicant's professional profile",
            Field::ResumeFile => "Name of the uploaded resume/CV file",
        }
    }

    /// Accepts the canonical wire name, or the `<criterion>_description`
    /// spelling for the evidentiary criteria.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        if let Some(field) = Self::ALL.into_iter().find(|f| f.as_str() == key) {
            return Some(field);
        }
        let base = key.strip_suffix("_description")?;
        Self::ALL
            .into_iter()
            .find(|f| f.group() == FieldGroup::Eb1aCriteria && f.as_str() == base)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_key(s).ok_or_else(|| format!("unknown record field '{s}'"))
    }
}

/// The applicant record. Every field in `Field::ALL` is always present;
/// an unanswered field holds the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: BTreeMap<Field, String>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    pub fn new() -> Self {
        Self {
            values: Field::ALL
                .into_iter()
                .map(|f| (f, String::new()))
                .collect(),
        }
    }

    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn is_filled(&self, field: Field) -> bool {
        !self.get(field).trim().is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    // Only the merge engine writes values.
    fn set(&mut self, field: Field, value: String) {
        self.values.insert(field, value);
    }

    /// Pretty JSON snapshot handed to the completion service as context.
    pub fn to_context_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_has_every_field_empty() {
        let record = Record::new();
        assert_eq!(record.len(), Field::ALL.len());
        assert!(record.iter().all(|(_, v)| v.is_empty()));
    }

    #[test]
    fn test_record_serializes_all_keys_in_schema_order() {
        let json = serde_json::to_value(Record::new()).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        let mut expected: Vec<_> = Field::ALL.iter().map(|f| f.as_str().to_string()).collect();
        // serde_json without preserve_order sorts keys
        expected.sort();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(sorted, expected);
        assert_eq!(json["first_name"], "");
        assert_eq!(json["resume_file"], "");
    }

    #[test]
    fn test_field_from_key_accepts_description_alias_for_criteria() {
        assert_eq!(Field::from_key("awards_description"), Some(Field::Awards));
        assert_eq!(
            Field::from_key("high_salary_description"),
            Some(Field::HighSalary)
        );
        assert_eq!(Field::from_key("email_description"), None);
        assert_eq!(Field::from_key("favourite_color"), None);
    }

    #[test]
    fn test_field_name_round_trips_through_serde() {
        for field in Field::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn test_groups_cover_the_schema() {
        let criteria = Field::ALL
            .iter()
            .filter(|f| f.group() == FieldGroup::Eb1aCriteria)
            .count();
        assert_eq!(criteria, 10);
        assert_eq!(Field::ResumeFile.group(), FieldGroup::SupportingDocuments);
        assert_eq!(
            FieldGroup::from_key("visa_and_role"),
            Some(FieldGroup::VisaAndRole)
        );
    }
}
