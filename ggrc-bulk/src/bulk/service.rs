//! Bulk complete / verify / save
//!
//! Each operation builds import blocks from the request, applies them and
//! reports the outcome for every assessment involved.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use ggrc_common::db::{assessments, people};
use tracing::{error, info};

use super::assembler::{referenced_person_ids, AssembledStubs, StubAssembler, StubRegistry};
use super::csvbuilder::BulkCsvBuilder;
use super::importer::{BlockImporter, ImportReport};
use super::normalizer::PeopleIndex;
use super::types::BulkRequest;
use crate::error::{ApiError, ApiResult};
use crate::notifications::{prepare_notification_data, BulkNotificationData, BulkOperation};
use crate::AppState;

/// Bulk operations on behalf of one request
pub struct BulkService<'a> {
    state: &'a AppState,
    today: NaiveDate,
    recipient: Option<String>,
}

impl<'a> BulkService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            today: chrono::Local::now().date_naive(),
            recipient: None,
        }
    }

    /// Date used for verified and finished dates
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Email of the user the result is reported to
    pub fn with_recipient(mut self, recipient: Option<String>) -> Self {
        self.recipient = recipient;
        self
    }

    /// Save attribute values, then complete (or send to review) every assessment
    pub async fn complete(&self, request: &BulkRequest) -> ApiResult<BulkNotificationData> {
        if request.assessments_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "assessments_ids list for /complete operation can't be empty.".to_string(),
            ));
        }

        let mut assembled = self.assemble(request).await?;
        self.load_assessment_flags(&mut assembled.stubs).await?;
        let builder = BulkCsvBuilder::new(assembled);

        let importer = self.importer();
        let mut report = importer.import(&builder.attributes_update_to_csv()).await?;
        let completion = builder.completion_block(&request.assessments_ids, &report.errors);
        if let Some(block) = completion {
            report.merge(importer.import(std::slice::from_ref(&block)).await?);
        }

        self.finish(BulkOperation::Complete, &report, &request.assessments_ids)
            .await
    }

    /// Verify assessments that are in review and have verifiers
    pub async fn verify(&self, request: &BulkRequest) -> ApiResult<BulkNotificationData> {
        if request.assessments_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "assessments_ids list for /verify operation can't be empty.".to_string(),
            ));
        }

        let mut stubs = StubRegistry::preseeded(&request.assessments_ids);
        self.load_assessment_flags(&mut stubs).await?;

        let mut report = ImportReport::default();
        for stub in stubs.values() {
            if !stub.slug.is_empty() && !stub.needs_verification {
                report.errors.insert(stub.slug.clone());
            }
        }

        let builder = BulkCsvBuilder::new(AssembledStubs {
            stubs,
            cav_keys: Vec::new(),
        });
        let verified = self
            .importer()
            .import(&builder.assessments_verify_to_csv(self.today))
            .await?;
        report.merge(verified);

        self.finish(BulkOperation::Verify, &report, &request.assessments_ids)
            .await
    }

    /// Save attribute values, evidence and comments without changing state
    pub async fn save(&self, request: &BulkRequest) -> ApiResult<BulkNotificationData> {
        if !request.assessments_ids.is_empty() {
            return Err(ApiError::BadRequest(
                "assessments_ids list for /save operation should be empty.".to_string(),
            ));
        }

        let mut assembled = self.assemble(request).await?;
        self.load_assessment_flags(&mut assembled.stubs).await?;
        let ids = assembled.stubs.ids();
        let builder = BulkCsvBuilder::new(assembled);

        let report = self
            .importer()
            .import(&builder.attributes_update_to_csv())
            .await?;

        self.finish(BulkOperation::Save, &report, &ids).await
    }

    fn importer(&self) -> BlockImporter<'a> {
        BlockImporter::new(&self.state.db).with_date(self.today)
    }

    async fn assemble(&self, request: &BulkRequest) -> ApiResult<AssembledStubs> {
        let person_ids = referenced_person_ids(request);
        let people = PeopleIndex::new(people::emails_by_ids(&self.state.db, &person_ids).await?);
        Ok(StubAssembler::new(&self.state.normalizer, &people).assemble(request))
    }

    /// Stored slug and verification flag of every known assessment
    ///
    /// Ids that no longer exist keep the slug sent by the client.
    async fn load_assessment_flags(&self, stubs: &mut StubRegistry) -> ApiResult<()> {
        let ids = stubs.ids();
        let found = assessments::find_by_ids(&self.state.db, &ids).await?;
        let with_verifiers = assessments::with_verifiers(&self.state.db, &ids).await?;

        for assessment in found {
            if let Some(stub) = stubs.get_mut(assessment.id) {
                stub.needs_verification = with_verifiers.contains(&assessment.id);
                stub.slug = assessment.slug;
            }
        }

        Ok(())
    }

    async fn finish(
        &self,
        operation: BulkOperation,
        report: &ImportReport,
        ids: &[i64],
    ) -> ApiResult<BulkNotificationData> {
        let partial: BTreeSet<String> = report
            .warnings
            .difference(&report.errors)
            .cloned()
            .collect();
        let data = prepare_notification_data(
            &self.state.db,
            &self.state.app_url,
            &report.errors,
            &partial,
            ids,
        )
        .await?;

        info!(
            operation = ?operation,
            assessments = ids.len(),
            succeeded = data.succeeded.len(),
            update_errors = data.update_errors.len(),
            partial_errors = data.partial_errors.len(),
            deleted = data.deleted.len(),
            "Bulk operation done"
        );

        if let Err(e) = self
            .state
            .notifier
            .send(operation, self.recipient.as_deref(), &data)
            .await
        {
            error!("Failed to send bulk operation notification: {}", e);
        }

        Ok(data)
    }
}
