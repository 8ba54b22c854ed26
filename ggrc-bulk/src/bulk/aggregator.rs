//! Attribute value aggregation for `/cavs/search`
//!
//! Joins assessments to their local custom attribute definitions and
//! values, and reshapes the rows into the matrix the bulk edit grid
//! renders: one column per distinct definition shape, one row per
//! requested assessment.

use ggrc_common::db::{placeholders, ASSESSMENT_DEFINITION_TYPE};
use indexmap::IndexMap;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

/// One row of the assessment / CAD / CAV outer join
///
/// CAD columns are `None` for assessments without local attributes; CAV
/// columns are `None` when the definition has no stored value.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct JoinRow {
    pub assessment_id: i64,
    pub assessment_type: String,
    pub slug: String,
    pub title: String,
    pub status: String,
    pub urls_count: i64,
    pub files_count: i64,
    pub cad_id: Option<i64>,
    pub cad_title: Option<String>,
    pub cad_attribute_type: Option<String>,
    pub cad_mandatory: Option<bool>,
    pub cad_default_value: Option<String>,
    pub cad_multi_choice_options: Option<String>,
    pub cad_multi_choice_mandatory: Option<String>,
    pub cav_id: Option<i64>,
    pub cav_attribute_value: Option<String>,
    pub cav_attribute_object_id: Option<i64>,
    pub cav_preconditions_failed: Option<bool>,
}

/// Identity of one logical column shared by many assessments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeDefinitionKey {
    pub title: String,
    pub attribute_type: String,
    pub mandatory: bool,
    pub default_value: Option<String>,
    pub multi_choice_options: Option<String>,
    pub multi_choice_mandatory: Option<String>,
}

/// One assessment's entry in an attribute column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeValueStub {
    pub value: Option<String>,
    pub attribute_person_id: Option<i64>,
    pub preconditions_failed: Option<bool>,
    /// Assessment that owns the definition
    pub definition_id: i64,
    pub attribute_definition_id: i64,
    pub multi_choice_options: Option<String>,
    pub multi_choice_mandatory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeColumn {
    pub title: String,
    pub mandatory: bool,
    pub attribute_type: String,
    pub default_value: Option<String>,
    /// Assessment id to value, in join order
    pub values: IndexMap<i64, AttributeValueStub>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentSummary {
    pub assessment_type: String,
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub status: String,
    pub urls_count: i64,
    pub files_count: i64,
}

/// Response body of `/cavs/search`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CavsSearchResponse {
    pub attributes: Vec<AttributeColumn>,
    /// One entry per requested id, `null` for unknown assessments
    pub assessments: Vec<Option<AssessmentSummary>>,
}

impl JoinRow {
    fn definition_key(&self) -> Option<AttributeDefinitionKey> {
        self.cad_id?;
        Some(AttributeDefinitionKey {
            title: self.cad_title.clone().unwrap_or_default(),
            attribute_type: self.cad_attribute_type.clone().unwrap_or_default(),
            mandatory: self.cad_mandatory.unwrap_or(false),
            default_value: self.cad_default_value.clone(),
            multi_choice_options: self.cad_multi_choice_options.clone(),
            multi_choice_mandatory: self.cad_multi_choice_mandatory.clone(),
        })
    }

    fn value_stub(&self, cad_id: i64) -> AttributeValueStub {
        // A missing CAV is encoded as explicit nulls
        let has_value = self.cav_id.is_some();
        AttributeValueStub {
            value: self.cav_attribute_value.clone().filter(|_| has_value),
            attribute_person_id: self.cav_attribute_object_id.filter(|_| has_value),
            preconditions_failed: self.cav_preconditions_failed.filter(|_| has_value),
            definition_id: self.assessment_id,
            attribute_definition_id: cad_id,
            multi_choice_options: self.cad_multi_choice_options.clone(),
            multi_choice_mandatory: self.cad_multi_choice_mandatory.clone(),
        }
    }

    fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            assessment_type: self.assessment_type.clone(),
            id: self.assessment_id,
            slug: self.slug.clone(),
            title: self.title.clone(),
            status: self.status.clone(),
            urls_count: self.urls_count,
            files_count: self.files_count,
        }
    }
}

/// Run the assessment / CAD / CAV outer join for `ids`
pub async fn fetch_join_rows(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<JoinRow>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"
        SELECT
            a.id AS assessment_id,
            a.assessment_type,
            a.slug,
            a.title,
            a.status,
            (SELECT COUNT(*) FROM evidence e
             WHERE e.assessment_id = a.id AND e.kind = 'URL') AS urls_count,
            (SELECT COUNT(*) FROM evidence e
             WHERE e.assessment_id = a.id AND e.kind = 'FILE') AS files_count,
            cad.id AS cad_id,
            cad.title AS cad_title,
            cad.attribute_type AS cad_attribute_type,
            cad.mandatory AS cad_mandatory,
            cad.default_value AS cad_default_value,
            cad.multi_choice_options AS cad_multi_choice_options,
            cad.multi_choice_mandatory AS cad_multi_choice_mandatory,
            cav.id AS cav_id,
            cav.attribute_value AS cav_attribute_value,
            cav.attribute_object_id AS cav_attribute_object_id,
            cav.preconditions_failed AS cav_preconditions_failed
        FROM assessments a
        LEFT JOIN custom_attribute_definitions cad
            ON cad.definition_id = a.id AND cad.definition_type = ?
        LEFT JOIN custom_attribute_values cav
            ON cav.custom_attribute_id = cad.id AND cav.attributable_id = a.id
        WHERE a.id IN ({})
        ORDER BY a.id, cad.id
        "#,
        placeholders(ids.len())
    );

    let mut query = sqlx::query_as::<_, JoinRow>(&sql).bind(ASSESSMENT_DEFINITION_TYPE);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;
    debug!(ids = ids.len(), rows = rows.len(), "Fetched attribute join rows");
    Ok(rows)
}

/// Fold join rows into the attribute matrix
///
/// Assessments are emitted in `ids` order regardless of row order;
/// attribute columns in first-seen row order.
pub fn aggregate(rows: &[JoinRow], ids: &[i64]) -> CavsSearchResponse {
    let mut attributes: IndexMap<AttributeDefinitionKey, AttributeColumn> = IndexMap::new();
    let mut assessments: IndexMap<i64, Option<AssessmentSummary>> =
        ids.iter().map(|id| (*id, None)).collect();

    for row in rows {
        if let (Some(key), Some(cad_id)) = (row.definition_key(), row.cad_id) {
            let column = attributes.entry(key).or_insert_with_key(|key| AttributeColumn {
                title: key.title.clone(),
                mandatory: key.mandatory,
                attribute_type: key.attribute_type.clone(),
                default_value: key.default_value.clone(),
                values: IndexMap::new(),
            });
            column.values.insert(row.assessment_id, row.value_stub(cad_id));
        }

        let summary = assessments.entry(row.assessment_id).or_insert(None);
        if summary.is_none() {
            *summary = Some(row.summary());
        }
    }

    CavsSearchResponse {
        attributes: attributes.into_values().collect(),
        assessments: assessments.into_values().collect(),
    }
}

/// Load the attribute matrix for `ids`
pub async fn search(pool: &SqlitePool, ids: &[i64]) -> Result<CavsSearchResponse, sqlx::Error> {
    if ids.is_empty() {
        return Ok(CavsSearchResponse::default());
    }
    let rows = fetch_join_rows(pool, ids).await?;
    Ok(aggregate(&rows, ids))
}
