//! Database initialization
//!
//! Creates the database file on first run and the schema idempotently
//! (`CREATE TABLE IF NOT EXISTS`), so it is safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets the notification queries read while a row transaction writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table used by the bulk operations service
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_people_table(pool).await?;
    create_assessments_table(pool).await?;
    create_access_control_people_table(pool).await?;
    create_custom_attribute_definitions_table(pool).await?;
    create_custom_attribute_values_table(pool).await?;
    create_evidence_table(pool).await?;
    create_comments_table(pool).await?;
    Ok(())
}

async fn create_people_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS people (
            id INTEGER PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assessments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assessments (
            id INTEGER PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Not Started',
            assessment_type TEXT NOT NULL DEFAULT 'Control',
            verified_date TEXT,
            finished_date TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_access_control_people_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS access_control_people (
            assessment_id INTEGER NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
            person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            role_name TEXT NOT NULL,
            PRIMARY KEY (assessment_id, person_id, role_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_custom_attribute_definitions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custom_attribute_definitions (
            id INTEGER PRIMARY KEY,
            definition_type TEXT NOT NULL,
            definition_id INTEGER,
            title TEXT NOT NULL,
            attribute_type TEXT NOT NULL,
            mandatory INTEGER NOT NULL DEFAULT 0,
            default_value TEXT,
            multi_choice_options TEXT,
            multi_choice_mandatory TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cad_definition
         ON custom_attribute_definitions(definition_type, definition_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_custom_attribute_values_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS custom_attribute_values (
            id INTEGER PRIMARY KEY,
            custom_attribute_id INTEGER NOT NULL
                REFERENCES custom_attribute_definitions(id) ON DELETE CASCADE,
            attributable_id INTEGER NOT NULL,
            attribute_value TEXT,
            attribute_object_id INTEGER,
            preconditions_failed INTEGER,
            UNIQUE (custom_attribute_id, attributable_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_evidence_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS evidence (
            id INTEGER PRIMARY KEY,
            assessment_id INTEGER NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('URL', 'FILE')),
            link TEXT NOT NULL,
            source_gdrive_id TEXT,
            notes TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            modified_by_id INTEGER,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY,
            assessment_id INTEGER NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
            custom_attribute_definition_id INTEGER
                REFERENCES custom_attribute_definitions(id) ON DELETE SET NULL,
            description TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
