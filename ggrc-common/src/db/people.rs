//! Person lookups

use super::placeholders;
use crate::Result;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;

/// Map person id to email for every id that exists
pub async fn emails_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let sql = format!(
        "SELECT id, email FROM people WHERE id IN ({})",
        placeholders(ids.len())
    );
    let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.fetch_all(pool).await?.into_iter().collect())
}

/// Resolve a person id by email (case-insensitive)
pub async fn id_by_email(conn: &mut SqliteConnection, email: &str) -> Result<Option<i64>> {
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM people WHERE lower(email) = lower(?)")
        .bind(email.trim())
        .fetch_optional(conn)
        .await?;

    Ok(id)
}
