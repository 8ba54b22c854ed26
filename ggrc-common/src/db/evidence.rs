//! Evidence and comment persistence

use super::models::EvidenceKind;
use crate::Result;
use sqlx::SqliteConnection;

/// Whether the assessment already has this evidence
pub async fn exists(
    conn: &mut SqliteConnection,
    assessment_id: i64,
    kind: EvidenceKind,
    link: &str,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM evidence WHERE assessment_id = ? AND kind = ? AND link = ?",
    )
    .bind(assessment_id)
    .bind(kind.as_str())
    .bind(link)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Attach evidence to an assessment, returning the new evidence id
///
/// File evidence keeps the Drive id both as link and as source id.
pub async fn insert(
    conn: &mut SqliteConnection,
    assessment_id: i64,
    kind: EvidenceKind,
    link: &str,
) -> Result<i64> {
    let source_gdrive_id = match kind {
        EvidenceKind::File => Some(link),
        EvidenceKind::Url => None,
    };

    let result = sqlx::query(
        "INSERT INTO evidence (assessment_id, kind, link, source_gdrive_id) VALUES (?, ?, ?, ?)",
    )
    .bind(assessment_id)
    .bind(kind.as_str())
    .bind(link)
    .bind(source_gdrive_id)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Add a comment to an assessment, optionally tied to a local attribute
pub async fn insert_comment(
    conn: &mut SqliteConnection,
    assessment_id: i64,
    cad_id: Option<i64>,
    description: &str,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO comments (assessment_id, custom_attribute_definition_id, description)
         VALUES (?, ?, ?)",
    )
    .bind(assessment_id)
    .bind(cad_id)
    .bind(description)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}
