//! Stub assembly
//!
//! Folds the per-assessment attribute submissions of a bulk request into
//! one [`AssessmentStub`] per assessment. Nothing is persisted here.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::normalizer::{parse_person_id, raw_value_text, AttributeType, Normalizer, PeopleIndex};
use super::types::BulkRequest;

/// Comment to attach to an assessment's local custom attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRecord {
    pub description: String,
    /// Custom attribute definition the comment belongs to
    pub cad_id: i64,
}

/// Everything collected for one assessment during a request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssessmentStub {
    pub files: Vec<String>,
    pub urls: Vec<String>,
    pub comments: Vec<CommentRecord>,
    /// Attribute title to normalized value
    pub cavs: HashMap<String, String>,
    pub slug: String,
    pub needs_verification: bool,
}

/// Assessment stubs in registration order
#[derive(Debug, Clone, Default)]
pub struct StubRegistry {
    stubs: IndexMap<i64, AssessmentStub>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with an empty stub for every id, in the given order
    pub fn preseeded(ids: &[i64]) -> Self {
        let mut registry = Self::new();
        for id in ids {
            registry.get_or_create(*id);
        }
        registry
    }

    pub fn get_or_create(&mut self, assessment_id: i64) -> &mut AssessmentStub {
        self.stubs.entry(assessment_id).or_default()
    }

    pub fn get(&self, assessment_id: i64) -> Option<&AssessmentStub> {
        self.stubs.get(&assessment_id)
    }

    pub fn get_mut(&mut self, assessment_id: i64) -> Option<&mut AssessmentStub> {
        self.stubs.get_mut(&assessment_id)
    }

    pub fn ids(&self) -> Vec<i64> {
        self.stubs.keys().copied().collect()
    }

    pub fn values(&self) -> impl Iterator<Item = &AssessmentStub> {
        self.stubs.values()
    }
}

/// Result of assembling a request
#[derive(Debug, Clone, Default)]
pub struct AssembledStubs {
    pub stubs: StubRegistry,
    /// Attribute titles in first-seen order; fixes the CSV column order
    pub cav_keys: Vec<String>,
}

/// Folds attribute submissions into stubs
pub struct StubAssembler<'a> {
    normalizer: &'a Normalizer,
    people: &'a PeopleIndex,
}

impl<'a> StubAssembler<'a> {
    pub fn new(normalizer: &'a Normalizer, people: &'a PeopleIndex) -> Self {
        Self { normalizer, people }
    }

    pub fn assemble(&self, request: &BulkRequest) -> AssembledStubs {
        let mut stubs = StubRegistry::preseeded(&request.assessments_ids);
        let mut cav_keys: IndexSet<String> = IndexSet::new();

        for submission in &request.attributes {
            let stub = stubs.get_or_create(submission.assessment.id);
            if !submission.assessment.slug.is_empty() {
                stub.slug = submission.assessment.slug.clone();
            }

            for cav in &submission.values {
                let raw = raw_value_text(&cav.value);
                let value = self
                    .normalizer
                    .normalize(raw.as_deref(), &cav.attribute_type, self.people);

                cav_keys.insert(cav.title.clone());
                stub.cavs.insert(cav.title.clone(), value);

                let Some(extra) = &cav.extra else {
                    continue;
                };
                stub.urls.extend(extra.urls.iter().cloned());
                stub.files
                    .extend(extra.files.iter().map(|file| file.source_gdrive_id.clone()));
                let description = extra.comment.as_ref().and_then(|c| c.description.clone());
                if let Some(description) = description {
                    stub.comments.push(CommentRecord {
                        description,
                        cad_id: cav.id,
                    });
                }
            }
        }

        AssembledStubs {
            stubs,
            cav_keys: cav_keys.into_iter().collect(),
        }
    }
}

/// Person ids referenced by Map:Person submissions, for prefetching emails
pub fn referenced_person_ids(request: &BulkRequest) -> Vec<i64> {
    let ids: IndexSet<i64> = request
        .attributes
        .iter()
        .flat_map(|submission| submission.values.iter())
        .filter(|cav| AttributeType::parse(&cav.attribute_type) == AttributeType::MapPerson)
        .filter_map(|cav| parse_person_id(raw_value_text(&cav.value).as_deref()))
        .collect();
    ids.into_iter().collect()
}
