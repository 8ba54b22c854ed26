//! Shared fixtures for ggrc-bulk integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ggrc_bulk::notifications::{BulkNotificationData, BulkOperation, Notifier};
use ggrc_bulk::AppState;
use ggrc_common::db::init_database;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const APP_URL: &str = "http://ggrc.test";

/// Temporary database that lives as long as this value
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("ggrc.db"))
        .await
        .expect("Should initialize test database");
    TestDb { pool, _dir: dir }
}

/// Notifier that keeps every delivered payload
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(BulkOperation, Option<String>, BulkNotificationData)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        operation: BulkOperation,
        recipient: Option<&str>,
        data: &BulkNotificationData,
    ) -> ggrc_common::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((operation, recipient.map(str::to_string), data.clone()));
        Ok(())
    }
}

/// Notifier that always fails
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(
        &self,
        _operation: BulkOperation,
        _recipient: Option<&str>,
        _data: &BulkNotificationData,
    ) -> ggrc_common::Result<()> {
        Err(ggrc_common::Error::Notification("mail server down".into()))
    }
}

pub fn app_state(pool: &SqlitePool) -> (AppState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(pool.clone(), APP_URL).with_notifier(notifier.clone());
    (state, notifier)
}

pub async fn add_person(pool: &SqlitePool, id: i64, email: &str) {
    sqlx::query("INSERT INTO people (id, email, name) VALUES (?, ?, ?)")
        .bind(id)
        .bind(email)
        .bind(email)
        .execute(pool)
        .await
        .expect("Should insert person");
}

pub async fn add_assessment(pool: &SqlitePool, id: i64, slug: &str, status: &str) {
    sqlx::query("INSERT INTO assessments (id, slug, title, status) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(slug)
        .bind(format!("Title {}", slug))
        .bind(status)
        .execute(pool)
        .await
        .expect("Should insert assessment");
}

pub async fn add_verifier(pool: &SqlitePool, assessment_id: i64, person_id: i64) {
    sqlx::query(
        "INSERT INTO access_control_people (assessment_id, person_id, role_name)
         VALUES (?, ?, 'Verifiers')",
    )
    .bind(assessment_id)
    .bind(person_id)
    .execute(pool)
    .await
    .expect("Should insert verifier");
}

/// Local custom attribute definition on an assessment
pub struct Lca<'a> {
    pub id: i64,
    pub assessment_id: i64,
    pub title: &'a str,
    pub attribute_type: &'a str,
    pub mandatory: bool,
    pub options: Option<&'a str>,
}

impl<'a> Lca<'a> {
    pub fn text(id: i64, assessment_id: i64, title: &'a str) -> Self {
        Self {
            id,
            assessment_id,
            title,
            attribute_type: "Text",
            mandatory: false,
            options: None,
        }
    }

    pub fn of_type(mut self, attribute_type: &'a str) -> Self {
        self.attribute_type = attribute_type;
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn options(mut self, options: &'a str) -> Self {
        self.options = Some(options);
        self
    }
}

pub async fn add_lca(pool: &SqlitePool, lca: Lca<'_>) {
    sqlx::query(
        r#"
        INSERT INTO custom_attribute_definitions
            (id, definition_type, definition_id, title, attribute_type, mandatory,
             multi_choice_options)
        VALUES (?, 'assessment', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(lca.id)
    .bind(lca.assessment_id)
    .bind(lca.title)
    .bind(lca.attribute_type)
    .bind(lca.mandatory)
    .bind(lca.options)
    .execute(pool)
    .await
    .expect("Should insert custom attribute definition");
}

pub async fn add_value(
    pool: &SqlitePool,
    cad_id: i64,
    assessment_id: i64,
    value: &str,
    object_id: Option<i64>,
) {
    sqlx::query(
        r#"
        INSERT INTO custom_attribute_values
            (custom_attribute_id, attributable_id, attribute_value, attribute_object_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(cad_id)
    .bind(assessment_id)
    .bind(value)
    .bind(object_id)
    .execute(pool)
    .await
    .expect("Should insert custom attribute value");
}

pub async fn add_evidence(pool: &SqlitePool, assessment_id: i64, kind: &str, link: &str) {
    sqlx::query("INSERT INTO evidence (assessment_id, kind, link) VALUES (?, ?, ?)")
        .bind(assessment_id)
        .bind(kind)
        .bind(link)
        .execute(pool)
        .await
        .expect("Should insert evidence");
}

pub async fn status_of(pool: &SqlitePool, assessment_id: i64) -> String {
    sqlx::query_scalar("SELECT status FROM assessments WHERE id = ?")
        .bind(assessment_id)
        .fetch_one(pool)
        .await
        .expect("Should read status")
}

pub async fn stored_value(
    pool: &SqlitePool,
    cad_id: i64,
    assessment_id: i64,
) -> Option<(Option<String>, Option<i64>)> {
    sqlx::query_as(
        "SELECT attribute_value, attribute_object_id FROM custom_attribute_values
         WHERE custom_attribute_id = ? AND attributable_id = ?",
    )
    .bind(cad_id)
    .bind(assessment_id)
    .fetch_optional(pool)
    .await
    .expect("Should read value")
}

pub async fn count(pool: &SqlitePool, sql: &str, assessment_id: i64) -> i64 {
    sqlx::query_scalar(sql)
        .bind(assessment_id)
        .fetch_one(pool)
        .await
        .expect("Should count rows")
}
