//! Assessment queries shared by the bulk operations

use super::models::{Assessment, VERIFIERS_ROLE};
use super::placeholders;
use crate::Result;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;

const ASSESSMENT_COLUMNS: &str =
    "id, slug, title, status, assessment_type, verified_date, finished_date";

/// Load assessments by id, ordered by id
///
/// Ids that do not exist are silently absent from the result.
pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Assessment>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM assessments WHERE id IN ({}) ORDER BY id",
        ASSESSMENT_COLUMNS,
        placeholders(ids.len())
    );
    let mut query = sqlx::query_as::<_, Assessment>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Load assessments by slug, ordered by id
pub async fn find_by_slugs<S: AsRef<str>>(
    pool: &SqlitePool,
    slugs: &[S],
) -> Result<Vec<Assessment>> {
    if slugs.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {} FROM assessments WHERE slug IN ({}) ORDER BY id",
        ASSESSMENT_COLUMNS,
        placeholders(slugs.len())
    );
    let mut query = sqlx::query_as::<_, Assessment>(&sql);
    for slug in slugs {
        query = query.bind(slug.as_ref());
    }

    Ok(query.fetch_all(pool).await?)
}

/// Ids (out of `ids`) of assessments that have at least one verifier assigned
pub async fn with_verifiers(pool: &SqlitePool, ids: &[i64]) -> Result<HashSet<i64>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let sql = format!(
        "SELECT DISTINCT assessment_id FROM access_control_people
         WHERE role_name = ? AND assessment_id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(VERIFIERS_ROLE);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(pool).await?.into_iter().collect())
}

/// Load one assessment by slug inside a transaction
pub async fn find_by_slug(conn: &mut SqliteConnection, slug: &str) -> Result<Option<Assessment>> {
    let sql = format!("SELECT {} FROM assessments WHERE slug = ?", ASSESSMENT_COLUMNS);
    let assessment = sqlx::query_as::<_, Assessment>(&sql)
        .bind(slug)
        .fetch_optional(conn)
        .await?;

    Ok(assessment)
}

/// Status transition; `None` dates keep their stored value
#[derive(Debug, Clone, Copy, Default)]
pub struct StateChange<'a> {
    pub status: &'a str,
    pub finished_date: Option<&'a str>,
    pub verified_date: Option<&'a str>,
}

/// Apply a status transition and bump `updated_at`
pub async fn update_state(
    conn: &mut SqliteConnection,
    id: i64,
    change: StateChange<'_>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE assessments SET
            status = ?,
            finished_date = COALESCE(?, finished_date),
            verified_date = COALESCE(?, verified_date),
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(change.status)
    .bind(change.finished_date)
    .bind(change.verified_date)
    .bind(id)
    .execute(conn)
    .await?;

    Ok(())
}
