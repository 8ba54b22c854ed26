//! Block import
//!
//! Applies the blocks produced by [`BulkCsvBuilder`](super::csvbuilder::BulkCsvBuilder)
//! to the database. Each data row runs in its own transaction: a rejected
//! row is rolled back and reported by slug, the remaining rows still apply.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use ggrc_common::db::assessments::{self, StateChange};
use ggrc_common::db::{
    attributes, evidence, people, status, Assessment, CustomAttributeDefinition, EvidenceKind,
};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::csvbuilder::{
    CsvBlock, CsvRow, ASSESSMENT, CODE, CUSTOM_ATTRIBUTE_DEFINITION, DESCRIPTION, EVIDENCE_FILE,
    EVIDENCE_URL, LCA_COMMENT, STATE, VERIFIED_DATE, VERIFY_DATE_FORMAT,
};
use super::normalizer::AttributeType;
use crate::statusaffected::{AttributeSnapshot, ObjectKind, StatusAffectedChanges};

const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Stored value of a Map:Person attribute; the person is in `attribute_object_id`
const PERSON_VALUE: &str = "Person";

/// Slugs of rows that failed or were applied with skipped values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub errors: BTreeSet<String>,
    pub warnings: BTreeSet<String>,
}

impl ImportReport {
    pub fn merge(&mut self, other: ImportReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Why a row was rejected
#[derive(Debug, Error)]
enum RowError {
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Common(#[from] ggrc_common::Error),
}

fn reject<T>(reason: impl Into<String>) -> Result<T, RowError> {
    Err(RowError::Rejected(reason.into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Applied,
    AppliedWithWarnings,
}

#[derive(Debug)]
struct AttributesLayout {
    code: usize,
    urls: Option<usize>,
    files: Option<usize>,
    attributes: Vec<(usize, String)>,
}

#[derive(Debug)]
struct StateLayout {
    code: usize,
    state: usize,
    verified_date: Option<usize>,
}

#[derive(Debug)]
struct CommentLayout {
    description: usize,
    cad: usize,
}

/// Block kind recognized from its header row
#[derive(Debug)]
enum BlockKind {
    Attributes(AttributesLayout),
    State(StateLayout),
    LcaComment(CommentLayout),
}

impl BlockKind {
    fn detect(block: &CsvBlock) -> Option<Self> {
        match block.object_type() {
            ASSESSMENT => {
                let code = block.column(CODE)?;
                if let Some(state) = block.column(STATE) {
                    return Some(BlockKind::State(StateLayout {
                        code,
                        state,
                        verified_date: block.column(VERIFIED_DATE),
                    }));
                }
                let fixed = [ASSESSMENT, CODE, EVIDENCE_URL, EVIDENCE_FILE];
                let attributes = block
                    .header
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| !fixed.contains(&name.as_str()))
                    .map(|(idx, name)| (idx, name.clone()))
                    .collect();
                Some(BlockKind::Attributes(AttributesLayout {
                    code,
                    urls: block.column(EVIDENCE_URL),
                    files: block.column(EVIDENCE_FILE),
                    attributes,
                }))
            }
            LCA_COMMENT => Some(BlockKind::LcaComment(CommentLayout {
                description: block.column(DESCRIPTION)?,
                cad: block.column(CUSTOM_ATTRIBUTE_DEFINITION)?,
            })),
            _ => None,
        }
    }

    /// Key a failed row is reported under
    fn row_key(&self, row: &CsvRow) -> String {
        match self {
            BlockKind::Attributes(layout) => cell(row, Some(layout.code)).to_string(),
            BlockKind::State(layout) => cell(row, Some(layout.code)).to_string(),
            BlockKind::LcaComment(layout) => format!("cad:{}", cell(row, Some(layout.cad))),
        }
    }
}

fn cell(row: &CsvRow, idx: Option<usize>) -> &str {
    idx.and_then(|idx| row.get(idx))
        .map(|value| value.trim())
        .unwrap_or_default()
}

fn lines(value: &str) -> impl Iterator<Item = &str> {
    value.split('\n').map(str::trim).filter(|line| !line.is_empty())
}

/// Checkbox cell to stored "1"/"0"
pub fn parse_checkbox(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "1" => Some("1"),
        "no" | "false" | "0" | "" => Some("0"),
        _ => None,
    }
}

/// Dropdown option matching `value`, ignoring case
pub fn match_option(options: Option<&str>, value: &str) -> Option<String> {
    options?
        .split(',')
        .map(str::trim)
        .find(|option| option.eq_ignore_ascii_case(value.trim()))
        .map(str::to_string)
}

/// Multiselect options matching every comma separated part of `value`
///
/// `None` when any part is not an option.
pub fn match_options(options: Option<&str>, value: &str) -> Option<String> {
    let matched = value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match_option(options, part))
        .collect::<Option<Vec<String>>>()?;
    Some(matched.join(","))
}

/// States an edited assessment leaves for "In Progress"
fn reopens(current: &str) -> bool {
    status::is_done(current) || current == status::NOT_STARTED
}

fn value_snapshot(value: Option<&str>, object_id: Option<i64>) -> AttributeSnapshot {
    AttributeSnapshot::new()
        .with("attribute_value", value.filter(|v| !v.is_empty()))
        .with("attribute_object_id", object_id)
}

/// Value to store for one attribute cell
enum CellValue {
    Set {
        value: Option<String>,
        object_id: Option<i64>,
    },
    Skip,
}

/// Applies import blocks to the database
pub struct BlockImporter<'a> {
    pool: &'a SqlitePool,
    today: NaiveDate,
}

impl<'a> BlockImporter<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Date recorded as `finished_date` on completion
    pub fn with_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Apply `blocks` in order
    ///
    /// Only infrastructure failures (e.g. a transaction that cannot be
    /// started) are returned as errors; rejected rows end up in the report.
    pub async fn import(&self, blocks: &[CsvBlock]) -> ggrc_common::Result<ImportReport> {
        let mut report = ImportReport::default();

        for block in blocks {
            let Some(kind) = BlockKind::detect(block) else {
                warn!(header = ?block.header, "Skipping block with unrecognized header");
                continue;
            };

            for row in &block.rows {
                let key = kind.row_key(row);
                let mut tx = self.pool.begin().await?;

                let result = match &kind {
                    BlockKind::Attributes(layout) => {
                        self.apply_attributes(&mut tx, layout, row).await
                    }
                    BlockKind::State(layout) => self.apply_state(&mut tx, layout, row).await,
                    BlockKind::LcaComment(layout) => {
                        self.apply_comment(&mut tx, layout, row).await
                    }
                };

                match result {
                    Ok(outcome) => {
                        tx.commit().await?;
                        debug!(key = %key, ?outcome, "Import row applied");
                        if outcome == RowOutcome::AppliedWithWarnings {
                            report.warnings.insert(key);
                        }
                    }
                    Err(err) => {
                        tx.rollback().await?;
                        warn!(key = %key, error = %err, "Import row rejected");
                        report.errors.insert(key);
                    }
                }
            }
        }

        info!(
            blocks = blocks.len(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Import finished"
        );
        Ok(report)
    }

    async fn apply_attributes(
        &self,
        conn: &mut SqliteConnection,
        layout: &AttributesLayout,
        row: &CsvRow,
    ) -> Result<RowOutcome, RowError> {
        let assessment = require_assessment(&mut *conn, cell(row, Some(layout.code))).await?;
        let cads: HashMap<String, CustomAttributeDefinition> =
            attributes::definitions_for_assessment(&mut *conn, assessment.id)
                .await?
                .into_iter()
                .map(|cad| (cad.title.clone(), cad))
                .collect();

        let tracker =
            StatusAffectedChanges::new(ObjectKind::CustomAttributeValue, ObjectKind::Assessment);
        let mut warned = false;
        let mut values_affect = false;

        for (idx, title) in &layout.attributes {
            let raw = cell(row, Some(*idx));
            let Some(cad) = cads.get(title) else {
                warn!(
                    slug = %assessment.slug,
                    title = %title,
                    "No local attribute with this title"
                );
                warned = true;
                continue;
            };

            let (value, object_id) = match cell_value(&mut *conn, cad, raw).await? {
                CellValue::Set { value, object_id } => (value, object_id),
                CellValue::Skip => {
                    warn!(
                        slug = %assessment.slug,
                        title = %title,
                        value = %raw,
                        "Skipping invalid attribute value"
                    );
                    warned = true;
                    continue;
                }
            };

            let stored = attributes::find_value(&mut *conn, cad.id, assessment.id).await?;
            let before = match &stored {
                Some(cav) => {
                    value_snapshot(cav.attribute_value.as_deref(), cav.attribute_object_id)
                }
                None => value_snapshot(None, None),
            };
            let after = value_snapshot(value.as_deref(), object_id);
            if before.changed_fields(&after).is_empty() {
                continue;
            }

            if value.is_none() && object_id.is_none() {
                attributes::delete_value(&mut *conn, cad.id, assessment.id).await?;
            } else {
                attributes::upsert_value(
                    &mut *conn,
                    cad.id,
                    assessment.id,
                    value.as_deref(),
                    object_id,
                )
                .await?;
            }
            values_affect |= tracker.was_affected(&before, &after);
        }

        let evidence_added = self
            .attach_evidence(&mut *conn, &assessment, layout, row)
            .await?;

        if reopens(&assessment.status) && (values_affect || evidence_added) {
            debug!(
                slug = %assessment.slug,
                from = %assessment.status,
                "Moving assessment to In Progress"
            );
            assessments::update_state(
                &mut *conn,
                assessment.id,
                StateChange {
                    status: status::IN_PROGRESS,
                    ..Default::default()
                },
            )
            .await?;
        }

        Ok(if warned {
            RowOutcome::AppliedWithWarnings
        } else {
            RowOutcome::Applied
        })
    }

    /// Insert evidence not attached yet; returns whether any was added
    async fn attach_evidence(
        &self,
        conn: &mut SqliteConnection,
        assessment: &Assessment,
        layout: &AttributesLayout,
        row: &CsvRow,
    ) -> Result<bool, RowError> {
        let mut added = false;

        let cells = [
            (EvidenceKind::Url, cell(row, layout.urls)),
            (EvidenceKind::File, cell(row, layout.files)),
        ];
        for (kind, value) in cells {
            for link in lines(value) {
                if evidence::exists(&mut *conn, assessment.id, kind, link).await? {
                    continue;
                }
                evidence::insert(&mut *conn, assessment.id, kind, link).await?;
                added = true;
            }
        }

        Ok(added)
    }

    async fn apply_state(
        &self,
        conn: &mut SqliteConnection,
        layout: &StateLayout,
        row: &CsvRow,
    ) -> Result<RowOutcome, RowError> {
        let assessment = require_assessment(&mut *conn, cell(row, Some(layout.code))).await?;
        let Some(target) = status::canonical(cell(row, Some(layout.state))) else {
            return reject(format!("unknown state '{}'", cell(row, Some(layout.state))));
        };

        let verified_date = cell(row, layout.verified_date);
        if !verified_date.is_empty() {
            return self.verify(conn, &assessment, target, verified_date).await;
        }

        if target == status::COMPLETED || target == status::IN_REVIEW {
            check_mandatory(&mut *conn, &assessment).await?;
        }

        let finished = self.today.format(STORED_DATE_FORMAT).to_string();
        assessments::update_state(
            &mut *conn,
            assessment.id,
            StateChange {
                status: target,
                finished_date: (target == status::COMPLETED).then_some(finished.as_str()),
                verified_date: None,
            },
        )
        .await?;

        Ok(RowOutcome::Applied)
    }

    async fn verify(
        &self,
        conn: &mut SqliteConnection,
        assessment: &Assessment,
        target: &str,
        verified_date: &str,
    ) -> Result<RowOutcome, RowError> {
        if assessment.status != status::IN_REVIEW {
            return reject(format!(
                "only assessments in review can be verified, status is '{}'",
                assessment.status
            ));
        }
        let Ok(date) = NaiveDate::parse_from_str(verified_date, VERIFY_DATE_FORMAT) else {
            return reject(format!("invalid verified date '{}'", verified_date));
        };

        let date = date.format(STORED_DATE_FORMAT).to_string();
        assessments::update_state(
            conn,
            assessment.id,
            StateChange {
                status: target,
                finished_date: None,
                verified_date: Some(&date),
            },
        )
        .await?;

        Ok(RowOutcome::Applied)
    }

    async fn apply_comment(
        &self,
        conn: &mut SqliteConnection,
        layout: &CommentLayout,
        row: &CsvRow,
    ) -> Result<RowOutcome, RowError> {
        let description = cell(row, Some(layout.description));
        let raw_cad = cell(row, Some(layout.cad));

        let Ok(cad_id) = raw_cad.parse::<i64>() else {
            return reject(format!("invalid attribute definition id '{}'", raw_cad));
        };
        if description.is_empty() {
            return reject("empty comment");
        }
        let Some(cad) = attributes::find_definition(&mut *conn, cad_id).await? else {
            return reject(format!("unknown attribute definition {}", cad_id));
        };
        let Some(assessment_id) = cad.definition_id else {
            return reject(format!("attribute definition {} has no owner", cad_id));
        };

        evidence::insert_comment(conn, assessment_id, Some(cad.id), description).await?;
        Ok(RowOutcome::Applied)
    }
}

async fn require_assessment(
    conn: &mut SqliteConnection,
    slug: &str,
) -> Result<Assessment, RowError> {
    match assessments::find_by_slug(conn, slug).await? {
        Some(assessment) => Ok(assessment),
        None => reject(format!("unknown assessment '{}'", slug)),
    }
}

/// Parse one attribute cell according to the definition's type
async fn cell_value(
    conn: &mut SqliteConnection,
    cad: &CustomAttributeDefinition,
    raw: &str,
) -> Result<CellValue, RowError> {
    let parsed = match AttributeType::parse(&cad.attribute_type) {
        AttributeType::Checkbox => match parse_checkbox(raw) {
            Some(value) => CellValue::Set {
                value: Some(value.to_string()),
                object_id: None,
            },
            None => CellValue::Skip,
        },
        AttributeType::MapPerson if raw.is_empty() => CellValue::Set {
            value: None,
            object_id: None,
        },
        AttributeType::MapPerson => match people::id_by_email(conn, raw).await? {
            Some(person_id) => CellValue::Set {
                value: Some(PERSON_VALUE.to_string()),
                object_id: Some(person_id),
            },
            None => CellValue::Skip,
        },
        AttributeType::Dropdown if !raw.is_empty() => {
            match match_option(cad.multi_choice_options.as_deref(), raw) {
                Some(option) => CellValue::Set {
                    value: Some(option),
                    object_id: None,
                },
                None => CellValue::Skip,
            }
        }
        AttributeType::MultiselectDropdown if !raw.is_empty() => {
            match match_options(cad.multi_choice_options.as_deref(), raw) {
                Some(options) => CellValue::Set {
                    value: Some(options),
                    object_id: None,
                },
                None => CellValue::Skip,
            }
        }
        _ => CellValue::Set {
            value: Some(raw.to_string()),
            object_id: None,
        },
    };

    Ok(parsed)
}

/// Reject the row when a mandatory local attribute is not filled in
async fn check_mandatory(
    conn: &mut SqliteConnection,
    assessment: &Assessment,
) -> Result<(), RowError> {
    for (cad, cav) in attributes::mandatory_with_values(conn, assessment.id).await? {
        let filled = cav.map_or(false, |cav| match AttributeType::parse(&cad.attribute_type) {
            AttributeType::Checkbox => cav.attribute_value.as_deref() == Some("1"),
            AttributeType::MapPerson => cav.attribute_object_id.is_some(),
            _ => cav
                .attribute_value
                .as_deref()
                .map_or(false, |value| !value.trim().is_empty()),
        });
        if !filled {
            return reject(format!("mandatory attribute '{}' is empty", cad.title));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_checkbox() {
        assert_eq!(parse_checkbox("yes"), Some("1"));
        assert_eq!(parse_checkbox("TRUE"), Some("1"));
        assert_eq!(parse_checkbox("1"), Some("1"));
        assert_eq!(parse_checkbox("No"), Some("0"));
        assert_eq!(parse_checkbox(""), Some("0"));
        assert_eq!(parse_checkbox("maybe"), None);
    }

    #[test]
    fn test_match_option() {
        assert_eq!(match_option(Some("Low,Medium,High"), "medium"), Some("Medium".into()));
        assert_eq!(match_option(Some("Low, High"), "high"), Some("High".into()));
        assert_eq!(match_option(Some("Low,High"), "none"), None);
        assert_eq!(match_option(None, "Low"), None);
    }

    #[test]
    fn test_match_options() {
        let options = Some("onE,tWo,Three");
        assert_eq!(match_options(options, "One,three"), Some("onE,Three".into()));
        assert_eq!(match_options(options, " two , ONE "), Some("tWo,onE".into()));
        assert_eq!(match_options(options, "one,four"), None);
        assert_eq!(match_options(None, "one"), None);
    }

    #[test]
    fn test_reopens() {
        assert!(reopens(status::NOT_STARTED));
        assert!(reopens(status::COMPLETED));
        assert!(reopens(status::IN_REVIEW));
        assert!(!reopens(status::IN_PROGRESS));
        assert!(!reopens(status::REWORK_NEEDED));
    }

    #[test]
    fn test_value_snapshot_treats_empty_as_unset() {
        let empty = value_snapshot(Some(""), None);
        assert!(value_snapshot(None, None).changed_fields(&empty).is_empty());
        let person = value_snapshot(Some("Person"), Some(3));
        assert_eq!(
            empty.changed_fields(&person).into_iter().collect::<Vec<_>>(),
            vec!["attribute_object_id", "attribute_value"]
        );
    }

    #[test]
    fn test_detect_block_kinds() {
        let block = |header: &[&str]| CsvBlock {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        };

        let kind = BlockKind::detect(&block(&[
            ASSESSMENT,
            CODE,
            EVIDENCE_URL,
            EVIDENCE_FILE,
            "a",
            "b",
        ]));
        match kind {
            Some(BlockKind::Attributes(layout)) => {
                assert_eq!(layout.code, 1);
                assert_eq!(layout.urls, Some(2));
                assert_eq!(layout.attributes, vec![(4, "a".to_string()), (5, "b".to_string())]);
            }
            other => panic!("unexpected {:?}", other),
        }

        match BlockKind::detect(&block(&[ASSESSMENT, CODE, STATE, VERIFIED_DATE])) {
            Some(BlockKind::State(layout)) => assert_eq!(layout.verified_date, Some(3)),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(
            BlockKind::detect(&block(&[LCA_COMMENT, DESCRIPTION, CUSTOM_ATTRIBUTE_DEFINITION])),
            Some(BlockKind::LcaComment(_))
        ));
        assert!(BlockKind::detect(&block(&["Control", CODE])).is_none());
        assert!(BlockKind::detect(&block(&[ASSESSMENT, "Title"])).is_none());
    }

    #[test]
    fn test_row_keys() {
        let layout = CommentLayout { description: 1, cad: 2 };
        let row: CsvRow = vec!["".into(), "text".into(), "17".into()];
        assert_eq!(BlockKind::LcaComment(layout).row_key(&row), "cad:17");
    }

    #[test]
    fn test_report_merge() {
        let mut report = ImportReport::default();
        report.merge(ImportReport {
            errors: BTreeSet::from(["a".to_string()]),
            warnings: BTreeSet::from(["b".to_string()]),
        });
        report.merge(ImportReport {
            errors: BTreeSet::from(["a".to_string()]),
            warnings: BTreeSet::new(),
        });
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
    }
}
