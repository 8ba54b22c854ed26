//! Bulk operation result notifications
//!
//! Every assessment id of a bulk request is classified into exactly one of
//! succeeded, update_errors, partial_errors or deleted, and the result is
//! handed to a [`Notifier`].

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;
use ggrc_common::db::{assessments, Assessment};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

/// Bulk operations that report their outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Complete,
    Verify,
    Save,
}

impl BulkOperation {
    /// Notification subject
    pub fn title(&self) -> &'static str {
        match self {
            BulkOperation::Verify => "Bulk update of Assessments is finished",
            BulkOperation::Save => "Saving certifications in bulk is finished",
            BulkOperation::Complete => "Completing certifications in bulk is finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEntry {
    pub title: String,
    pub url: String,
}

/// Assessment that disappeared while the operation ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedEntry {
    pub id: i64,
}

/// Notification payload of one bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkNotificationData {
    pub update_errors: Vec<NotificationEntry>,
    pub partial_errors: Vec<NotificationEntry>,
    pub succeeded: Vec<NotificationEntry>,
    pub deleted: Vec<DeletedEntry>,
}

impl BulkNotificationData {
    /// Number of assessments reported across all buckets
    pub fn total(&self) -> usize {
        self.update_errors.len()
            + self.partial_errors.len()
            + self.succeeded.len()
            + self.deleted.len()
    }
}

/// Link to an assessment in the web application
pub fn object_url(app_url: &str, assessment_id: i64) -> String {
    format!("{}/assessments/{}", app_url.trim_end_matches('/'), assessment_id)
}

fn entry(app_url: &str, assessment: &Assessment) -> NotificationEntry {
    NotificationEntry {
        title: assessment.title.clone(),
        url: object_url(app_url, assessment.id),
    }
}

/// Classify `ids` by the slugs reported as failed or partially applied
///
/// Error slugs that do not belong to one of `ids` are ignored. An id whose
/// slug is in both sets counts as an update error.
pub async fn prepare_notification_data(
    pool: &SqlitePool,
    app_url: &str,
    update_errors: &BTreeSet<String>,
    partial_errors: &BTreeSet<String>,
    ids: &[i64],
) -> ggrc_common::Result<BulkNotificationData> {
    let requested: HashSet<i64> = ids.iter().copied().collect();

    let errors = slug_matches(pool, update_errors, &requested).await?;
    let error_ids: HashSet<i64> = errors.iter().map(|a| a.id).collect();

    let partial: Vec<Assessment> = slug_matches(pool, partial_errors, &requested)
        .await?
        .into_iter()
        .filter(|a| !error_ids.contains(&a.id))
        .collect();
    let partial_ids: HashSet<i64> = partial.iter().map(|a| a.id).collect();

    let mut seen = HashSet::new();
    let success_ids: Vec<i64> = ids
        .iter()
        .copied()
        .filter(|id| !error_ids.contains(id) && !partial_ids.contains(id))
        .filter(|id| seen.insert(*id))
        .collect();

    let found: HashMap<i64, Assessment> = assessments::find_by_ids(pool, &success_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let mut data = BulkNotificationData {
        update_errors: errors.iter().map(|a| entry(app_url, a)).collect(),
        partial_errors: partial.iter().map(|a| entry(app_url, a)).collect(),
        ..Default::default()
    };
    for id in success_ids {
        match found.get(&id) {
            Some(assessment) => data.succeeded.push(entry(app_url, assessment)),
            None => data.deleted.push(DeletedEntry { id }),
        }
    }

    Ok(data)
}

async fn slug_matches(
    pool: &SqlitePool,
    slugs: &BTreeSet<String>,
    requested: &HashSet<i64>,
) -> ggrc_common::Result<Vec<Assessment>> {
    let slugs: Vec<&str> = slugs.iter().map(String::as_str).collect();
    Ok(assessments::find_by_slugs(pool, &slugs)
        .await?
        .into_iter()
        .filter(|a| requested.contains(&a.id))
        .collect())
}

/// Receiver of bulk operation results
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the outcome of `operation` to `recipient`
    ///
    /// `recipient` is `None` when the request carried no user.
    async fn send(
        &self,
        operation: BulkOperation,
        recipient: Option<&str>,
        data: &BulkNotificationData,
    ) -> ggrc_common::Result<()>;
}

/// Notifier that records results in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        operation: BulkOperation,
        recipient: Option<&str>,
        data: &BulkNotificationData,
    ) -> ggrc_common::Result<()> {
        info!(
            subject = operation.title(),
            recipient = recipient.unwrap_or("-"),
            succeeded = data.succeeded.len(),
            update_errors = data.update_errors.len(),
            partial_errors = data.partial_errors.len(),
            deleted = data.deleted.len(),
            "Bulk operation finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(BulkOperation::Verify.title(), "Bulk update of Assessments is finished");
        assert_eq!(BulkOperation::Save.title(), "Saving certifications in bulk is finished");
        assert_eq!(
            BulkOperation::Complete.title(),
            "Completing certifications in bulk is finished"
        );
    }

    #[test]
    fn test_object_url() {
        assert_eq!(object_url("http://ggrc.local", 5), "http://ggrc.local/assessments/5");
        assert_eq!(object_url("http://ggrc.local/", 5), "http://ggrc.local/assessments/5");
    }

    #[test]
    fn test_payload_shape() {
        let data = BulkNotificationData {
            succeeded: vec![NotificationEntry { title: "A".into(), url: "u".into() }],
            deleted: vec![DeletedEntry { id: 3 }],
            ..Default::default()
        };
        let body = serde_json::to_value(&data).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "update_errors": [],
                "partial_errors": [],
                "succeeded": [{"title": "A", "url": "u"}],
                "deleted": [{"id": 3}]
            })
        );
        assert_eq!(data.total(), 2);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let data = BulkNotificationData::default();
        assert!(LogNotifier.send(BulkOperation::Save, None, &data).await.is_ok());
    }
}
