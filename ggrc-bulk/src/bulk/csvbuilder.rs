//! CSV block building for bulk updates via import
//!
//! Each block is rendered as an `Object type` marker row, a header row and
//! one row per entity. The header strings are the import engine's column
//! names and must match exactly.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use ggrc_common::db::status;
use serde::Serialize;

use super::assembler::{AssembledStubs, AssessmentStub, CommentRecord, StubRegistry};

pub const OBJECT_TYPE: &str = "Object type";
pub const ASSESSMENT: &str = "Assessment";
pub const CODE: &str = "Code";
pub const STATE: &str = "State";
pub const VERIFIED_DATE: &str = "Verified Date";
pub const EVIDENCE_URL: &str = "Evidence URL";
pub const EVIDENCE_FILE: &str = "Evidence File";
pub const LCA_COMMENT: &str = "LCA Comment";
pub const DESCRIPTION: &str = "description";
pub const CUSTOM_ATTRIBUTE_DEFINITION: &str = "custom_attribute_definition";

/// Date format of the "Verified Date" column
pub const VERIFY_DATE_FORMAT: &str = "%m/%d/%Y";

pub type CsvRow = Vec<String>;

/// One importable block: header plus data rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvBlock {
    pub header: CsvRow,
    pub rows: Vec<CsvRow>,
}

impl CsvBlock {
    /// Object type the block imports ("Assessment", "LCA Comment")
    pub fn object_type(&self) -> &str {
        self.header.first().map(String::as_str).unwrap_or_default()
    }

    /// Position of a header column
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    /// Rows as sent to the import engine, marker row first
    pub fn to_rows(&self) -> Vec<CsvRow> {
        let mut rows = Vec::with_capacity(self.rows.len() + 2);
        rows.push(vec![OBJECT_TYPE.to_string()]);
        rows.push(self.header.clone());
        rows.extend(self.rows.iter().cloned());
        rows
    }

    /// Split flat import rows back into blocks at each `Object type` marker
    ///
    /// Rows before the first marker are ignored.
    pub fn split(rows: &[CsvRow]) -> Vec<CsvBlock> {
        let mut blocks = Vec::new();
        let mut iter = rows.iter().peekable();

        while let Some(row) = iter.next() {
            if !is_marker(row) {
                continue;
            }
            let Some(header) = iter.next() else {
                break;
            };
            let mut block = CsvBlock {
                header: header.clone(),
                rows: Vec::new(),
            };
            while let Some(next) = iter.peek() {
                if is_marker(next) {
                    break;
                }
                block.rows.push((*next).clone());
                iter.next();
            }
            blocks.push(block);
        }

        blocks
    }
}

fn is_marker(row: &CsvRow) -> bool {
    row.len() == 1 && row[0] == OBJECT_TYPE
}

/// Flatten blocks into import rows
pub fn to_rows(blocks: &[CsvBlock]) -> Vec<CsvRow> {
    blocks.iter().flat_map(CsvBlock::to_rows).collect()
}

fn header(columns: &[&str]) -> CsvRow {
    columns.iter().map(|c| c.to_string()).collect()
}

/// Builds import blocks from assembled assessment stubs
#[derive(Debug, Clone)]
pub struct BulkCsvBuilder {
    stubs: StubRegistry,
    cav_keys: Vec<String>,
}

impl BulkCsvBuilder {
    pub fn new(assembled: AssembledStubs) -> Self {
        Self {
            stubs: assembled.stubs,
            cav_keys: assembled.cav_keys,
        }
    }

    /// Verification block: assessments flagged as needing verification
    pub fn verification_block(&self, verify_date: NaiveDate) -> Option<CsvBlock> {
        let date = verify_date.format(VERIFY_DATE_FORMAT).to_string();
        let rows: Vec<CsvRow> = self
            .stubs
            .values()
            .filter(|stub| stub.needs_verification)
            .map(|stub| {
                vec![
                    String::new(),
                    stub.slug.clone(),
                    status::COMPLETED.to_string(),
                    date.clone(),
                ]
            })
            .collect();

        if rows.is_empty() {
            return None;
        }
        Some(CsvBlock {
            header: header(&[ASSESSMENT, CODE, STATE, VERIFIED_DATE]),
            rows,
        })
    }

    /// Attributes and evidence block: assessments with at least one value
    pub fn attributes_block(&self) -> Option<CsvBlock> {
        let rows: Vec<CsvRow> = self
            .stubs
            .values()
            .filter(|stub| !stub.cavs.is_empty())
            .map(|stub| self.attributes_row(stub))
            .collect();

        if rows.is_empty() {
            return None;
        }
        let mut columns = header(&[ASSESSMENT, CODE, EVIDENCE_URL, EVIDENCE_FILE]);
        columns.extend(self.cav_keys.iter().cloned());
        Some(CsvBlock {
            header: columns,
            rows,
        })
    }

    fn attributes_row(&self, stub: &AssessmentStub) -> CsvRow {
        let mut row = vec![
            String::new(),
            stub.slug.clone(),
            stub.urls.join("\n"),
            stub.files.join("\n"),
        ];
        row.extend(
            self.cav_keys
                .iter()
                .map(|key| stub.cavs.get(key).cloned().unwrap_or_default()),
        );
        row
    }

    /// LCA comment block: one row per collected comment
    pub fn lca_comment_block(&self) -> Option<CsvBlock> {
        if !self.stubs.values().any(|stub| !stub.comments.is_empty()) {
            return None;
        }

        let rows = self
            .stubs
            .values()
            .flat_map(|stub| stub.comments.iter())
            .map(comment_row)
            .collect();
        Some(CsvBlock {
            header: header(&[LCA_COMMENT, DESCRIPTION, CUSTOM_ATTRIBUTE_DEFINITION]),
            rows,
        })
    }

    /// Completion block for the `requested` assessments not in `excluded_slugs`
    ///
    /// Assessments that only had values submitted keep their state.
    /// Assessments with verifiers go to review, the rest are completed.
    pub fn completion_block(
        &self,
        requested: &[i64],
        excluded_slugs: &BTreeSet<String>,
    ) -> Option<CsvBlock> {
        let mut seen = BTreeSet::new();
        let rows: Vec<CsvRow> = requested
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.stubs.get(*id))
            .filter(|stub| !stub.slug.is_empty() && !excluded_slugs.contains(&stub.slug))
            .map(|stub| {
                let state = if stub.needs_verification {
                    status::IN_REVIEW
                } else {
                    status::COMPLETED
                };
                vec![String::new(), stub.slug.clone(), state.to_string()]
            })
            .collect();

        if rows.is_empty() {
            return None;
        }
        Some(CsvBlock {
            header: header(&[ASSESSMENT, CODE, STATE]),
            rows,
        })
    }

    /// Blocks updating attribute values, evidence and LCA comments
    pub fn attributes_update_to_csv(&self) -> Vec<CsvBlock> {
        self.attributes_block()
            .into_iter()
            .chain(self.lca_comment_block())
            .collect()
    }

    /// Blocks verifying assessments
    pub fn assessments_verify_to_csv(&self, verify_date: NaiveDate) -> Vec<CsvBlock> {
        self.verification_block(verify_date).into_iter().collect()
    }
}

fn comment_row(comment: &CommentRecord) -> CsvRow {
    vec![
        String::new(),
        comment.description.clone(),
        comment.cad_id.to_string(),
    ]
}
