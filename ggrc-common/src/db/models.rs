//! Database models

use serde::{Deserialize, Serialize};

/// Custom attribute definitions scoped to a single assessment (LCA)
pub const ASSESSMENT_DEFINITION_TYPE: &str = "assessment";

/// Access control role whose members verify an assessment
pub const VERIFIERS_ROLE: &str = "Verifiers";

/// Assessment workflow states
pub mod status {
    pub const NOT_STARTED: &str = "Not Started";
    pub const IN_PROGRESS: &str = "In Progress";
    pub const IN_REVIEW: &str = "In Review";
    pub const VERIFIED: &str = "Verified";
    pub const COMPLETED: &str = "Completed";
    pub const DEPRECATED: &str = "Deprecated";
    pub const REWORK_NEEDED: &str = "Rework Needed";

    /// States in which further edits move the assessment back to In Progress
    pub const DONE_STATES: [&str; 3] = [IN_REVIEW, VERIFIED, COMPLETED];

    pub const ALL: [&str; 7] = [
        NOT_STARTED,
        IN_PROGRESS,
        IN_REVIEW,
        VERIFIED,
        COMPLETED,
        DEPRECATED,
        REWORK_NEEDED,
    ];

    pub fn is_done(status: &str) -> bool {
        DONE_STATES.contains(&status)
    }

    /// Canonical spelling of a state name, ignoring case
    pub fn canonical(name: &str) -> Option<&'static str> {
        ALL.iter()
            .copied()
            .find(|state| state.eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assessment {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: String,
    pub assessment_type: String,
    pub verified_date: Option<String>,
    pub finished_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Person {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// Custom attribute definition (CAD)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomAttributeDefinition {
    pub id: i64,
    pub definition_type: String,
    /// Owning object id (assessment id for LCAs)
    pub definition_id: Option<i64>,
    pub title: String,
    pub attribute_type: String,
    pub mandatory: bool,
    pub default_value: Option<String>,
    /// Comma separated option list for dropdowns
    pub multi_choice_options: Option<String>,
    pub multi_choice_mandatory: Option<String>,
}

/// Custom attribute value (CAV)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomAttributeValue {
    pub id: i64,
    pub custom_attribute_id: i64,
    pub attributable_id: i64,
    pub attribute_value: Option<String>,
    /// Referenced person id for Map:Person attributes
    pub attribute_object_id: Option<i64>,
    pub preconditions_failed: Option<bool>,
}

/// Evidence attached to an assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceKind {
    Url,
    File,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Url => "URL",
            EvidenceKind::File => "FILE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evidence {
    pub id: i64,
    pub assessment_id: i64,
    pub kind: String,
    pub link: String,
    pub source_gdrive_id: Option<String>,
    pub notes: String,
    pub description: String,
    pub modified_by_id: Option<i64>,
}
