//! Request payloads accepted by the bulk operation endpoints

use serde::Deserialize;
use serde_json::Value;

/// Body of `/complete`, `/verify` and `/cavs/save`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkRequest {
    #[serde(default)]
    pub assessments_ids: Vec<i64>,
    #[serde(default)]
    pub attributes: Vec<AssessmentAttributes>,
}

/// Attribute submissions for a single assessment
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentAttributes {
    pub assessment: AssessmentRef,
    #[serde(default)]
    pub values: Vec<AttributeSubmission>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentRef {
    pub id: i64,
    #[serde(default)]
    pub slug: String,
}

/// One attribute value as submitted by the bulk edit grid
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSubmission {
    /// Raw UI value: "0"/"1" for checkboxes, a person id for Map:Person
    #[serde(default)]
    pub value: Value,
    pub title: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    /// Owning assessment id of the definition
    #[serde(default)]
    pub definition_id: Option<i64>,
    /// Custom attribute definition id
    pub id: i64,
    #[serde(default)]
    pub extra: Option<AttributeExtra>,
}

/// Evidence and comment attached together with an attribute value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttributeExtra {
    #[serde(default)]
    pub comment: Option<CommentPayload>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub files: Vec<FilePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilePayload {
    pub source_gdrive_id: String,
}

/// Body of `/cavs/search`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CavsSearchRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}
