//! Tests for database initialization and the shared queries

use ggrc_common::db::{assessments, init::init_database, people};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("ggrc.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("ggrc.db");

    let pool1 = init_database(&db_path).await;
    assert!(pool1.is_ok());

    // Schema creation is idempotent
    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("ggrc.db")).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "access_control_people",
        "assessments",
        "comments",
        "custom_attribute_definitions",
        "custom_attribute_values",
        "evidence",
        "people",
    ] {
        assert!(tables.iter().any(|t| t == expected), "Missing table: {}", expected);
    }
}

#[tokio::test]
async fn test_assessment_and_people_queries() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("ggrc.db")).await.unwrap();

    sqlx::query("INSERT INTO people (id, email, name) VALUES (1, 'Alice@example.com', 'Alice')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO assessments (id, slug, title)
         VALUES (10, 'ASMT-10', 'First'), (20, 'ASMT-20', 'Second')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO access_control_people VALUES (20, 1, 'Verifiers')")
        .execute(&pool)
        .await
        .unwrap();

    let found = assessments::find_by_ids(&pool, &[20, 10, 99]).await.unwrap();
    assert_eq!(found.iter().map(|a| a.id).collect::<Vec<_>>(), vec![10, 20]);
    assert_eq!(found[0].status, "Not Started");

    let by_slug = assessments::find_by_slugs(&pool, &["ASMT-20"]).await.unwrap();
    assert_eq!(by_slug.len(), 1);
    assert_eq!(by_slug[0].id, 20);

    let verified = assessments::with_verifiers(&pool, &[10, 20]).await.unwrap();
    assert!(verified.contains(&20));
    assert!(!verified.contains(&10));

    let emails = people::emails_by_ids(&pool, &[1, 2]).await.unwrap();
    assert_eq!(emails.get(&1).map(String::as_str), Some("Alice@example.com"));
    assert!(!emails.contains_key(&2));

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(people::id_by_email(&mut conn, "alice@EXAMPLE.com").await.unwrap(), Some(1));
    assert_eq!(people::id_by_email(&mut conn, "bob@example.com").await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_id_lists_skip_queries() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("ggrc.db")).await.unwrap();

    assert!(assessments::find_by_ids(&pool, &[]).await.unwrap().is_empty());
    assert!(assessments::find_by_slugs::<&str>(&pool, &[]).await.unwrap().is_empty());
    assert!(assessments::with_verifiers(&pool, &[]).await.unwrap().is_empty());
    assert!(people::emails_by_ids(&pool, &[]).await.unwrap().is_empty());
}
