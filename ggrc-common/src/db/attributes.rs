//! Custom attribute definition and value queries

use super::models::{CustomAttributeDefinition, CustomAttributeValue, ASSESSMENT_DEFINITION_TYPE};
use crate::Result;
use sqlx::SqliteConnection;

const CAD_COLUMNS: &str = "id, definition_type, definition_id, title, attribute_type, mandatory, \
     default_value, multi_choice_options, multi_choice_mandatory";

/// Local custom attribute definitions of one assessment, ordered by id
pub async fn definitions_for_assessment(
    conn: &mut SqliteConnection,
    assessment_id: i64,
) -> Result<Vec<CustomAttributeDefinition>> {
    let sql = format!(
        "SELECT {} FROM custom_attribute_definitions
         WHERE definition_type = ? AND definition_id = ? ORDER BY id",
        CAD_COLUMNS
    );
    let cads = sqlx::query_as::<_, CustomAttributeDefinition>(&sql)
        .bind(ASSESSMENT_DEFINITION_TYPE)
        .bind(assessment_id)
        .fetch_all(conn)
        .await?;

    Ok(cads)
}

/// Load a local custom attribute definition by id
pub async fn find_definition(
    conn: &mut SqliteConnection,
    cad_id: i64,
) -> Result<Option<CustomAttributeDefinition>> {
    let sql = format!(
        "SELECT {} FROM custom_attribute_definitions WHERE id = ? AND definition_type = ?",
        CAD_COLUMNS
    );
    let cad = sqlx::query_as::<_, CustomAttributeDefinition>(&sql)
        .bind(cad_id)
        .bind(ASSESSMENT_DEFINITION_TYPE)
        .fetch_optional(conn)
        .await?;

    Ok(cad)
}

/// Stored value of one definition on one object
pub async fn find_value(
    conn: &mut SqliteConnection,
    cad_id: i64,
    attributable_id: i64,
) -> Result<Option<CustomAttributeValue>> {
    let cav = sqlx::query_as::<_, CustomAttributeValue>(
        r#"
        SELECT id, custom_attribute_id, attributable_id, attribute_value,
               attribute_object_id, preconditions_failed
        FROM custom_attribute_values
        WHERE custom_attribute_id = ? AND attributable_id = ?
        "#,
    )
    .bind(cad_id)
    .bind(attributable_id)
    .fetch_optional(conn)
    .await?;

    Ok(cav)
}

/// Insert or replace the value of one definition on one object
pub async fn upsert_value(
    conn: &mut SqliteConnection,
    cad_id: i64,
    attributable_id: i64,
    attribute_value: Option<&str>,
    attribute_object_id: Option<i64>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO custom_attribute_values
            (custom_attribute_id, attributable_id, attribute_value, attribute_object_id)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (custom_attribute_id, attributable_id) DO UPDATE SET
            attribute_value = excluded.attribute_value,
            attribute_object_id = excluded.attribute_object_id
        "#,
    )
    .bind(cad_id)
    .bind(attributable_id)
    .bind(attribute_value)
    .bind(attribute_object_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Remove the value of one definition on one object, if any
pub async fn delete_value(
    conn: &mut SqliteConnection,
    cad_id: i64,
    attributable_id: i64,
) -> Result<()> {
    sqlx::query(
        "DELETE FROM custom_attribute_values WHERE custom_attribute_id = ? AND attributable_id = ?",
    )
    .bind(cad_id)
    .bind(attributable_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Mandatory definitions of an assessment paired with their stored value
pub async fn mandatory_with_values(
    conn: &mut SqliteConnection,
    assessment_id: i64,
) -> Result<Vec<(CustomAttributeDefinition, Option<CustomAttributeValue>)>> {
    let cads = definitions_for_assessment(&mut *conn, assessment_id).await?;

    let mut result = Vec::new();
    for cad in cads.into_iter().filter(|cad| cad.mandatory) {
        let cav = find_value(&mut *conn, cad.id, assessment_id).await?;
        result.push((cad, cav));
    }

    Ok(result)
}
