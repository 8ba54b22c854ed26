//! Status-affected change tracking
//!
//! Decides whether a change to one object (e.g. an evidence) should move a
//! finished object it is attached to (e.g. an assessment) back to
//! "In Progress". The decision compares explicit before/after snapshots
//! over the fields declared per object kind pair.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

/// Kinds of objects taking part in status-affected checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ObjectKind {
    Assessment,
    Evidence,
    CustomAttributeValue,
    Comment,
}

/// Field values of one object at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeSnapshot {
    fields: BTreeMap<String, Value>,
}

impl AttributeSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Fields whose value differs between `self` and `after`
    ///
    /// A field present on one side only counts as changed.
    pub fn changed_fields(&self, after: &AttributeSnapshot) -> BTreeSet<String> {
        self.fields
            .keys()
            .chain(after.fields.keys())
            .filter(|field| self.fields.get(*field) != after.fields.get(*field))
            .cloned()
            .collect()
    }
}

/// Watched field groups for one (changed kind, affected kind) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AffectRules {
    /// Changes limited to these fields never affect status
    pub no_affect: &'static [&'static str],
    /// Changes to these fields always affect status
    pub side_affect: &'static [&'static str],
    /// Bookkeeping fields that are ignored entirely
    pub optional_affect: &'static [&'static str],
}

impl AffectRules {
    fn is_declared(&self, field: &str) -> bool {
        self.no_affect.contains(&field)
            || self.side_affect.contains(&field)
            || self.optional_affect.contains(&field)
    }
}

const EVIDENCE_ON_ASSESSMENT: AffectRules = AffectRules {
    no_affect: &["notes", "description"],
    side_affect: &["access_control_list"],
    optional_affect: &["updated_at", "modified_by_id"],
};

/// Rules for a kind pair; pairs without rules treat every field as base
pub fn rules_for(changed: ObjectKind, affected: ObjectKind) -> AffectRules {
    match (changed, affected) {
        (ObjectKind::Evidence, ObjectKind::Assessment) => EVIDENCE_ON_ASSESSMENT,
        _ => AffectRules::default(),
    }
}

/// Status-affected check for one changed object
#[derive(Debug, Clone, Copy)]
pub struct StatusAffectedChanges {
    rules: AffectRules,
}

impl StatusAffectedChanges {
    pub fn new(changed: ObjectKind, affected: ObjectKind) -> Self {
        Self {
            rules: rules_for(changed, affected),
        }
    }

    pub fn rules(&self) -> AffectRules {
        self.rules
    }

    /// Whether the change from `before` to `after` affects status
    ///
    /// Checked in order: base fields, side-affect fields, no-affect
    /// fields. When none of them changed the change counts as affecting.
    pub fn was_affected(&self, before: &AttributeSnapshot, after: &AttributeSnapshot) -> bool {
        let changed = before.changed_fields(after);

        if changed.iter().any(|field| !self.rules.is_declared(field)) {
            return true;
        }
        if changed
            .iter()
            .any(|field| self.rules.side_affect.contains(&field.as_str()))
        {
            return true;
        }
        if changed
            .iter()
            .any(|field| self.rules.no_affect.contains(&field.as_str()))
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence() -> AttributeSnapshot {
        AttributeSnapshot::new()
            .with("link", "http://example.com")
            .with("kind", "URL")
            .with("notes", "")
            .with("description", "")
            .with("modified_by_id", 1)
            .with("updated_at", "2020-01-01 00:00:00")
    }

    fn tracker() -> StatusAffectedChanges {
        StatusAffectedChanges::new(ObjectKind::Evidence, ObjectKind::Assessment)
    }

    #[test]
    fn test_notes_only_change_does_not_affect() {
        let after = evidence().with("notes", "reviewed");
        assert!(!tracker().was_affected(&evidence(), &after));
    }

    #[test]
    fn test_notes_with_bookkeeping_does_not_affect() {
        let after = evidence()
            .with("description", "d")
            .with("modified_by_id", 2)
            .with("updated_at", "2020-01-02 00:00:00");
        assert!(!tracker().was_affected(&evidence(), &after));
    }

    #[test]
    fn test_base_field_change_affects() {
        let after = evidence().with("notes", "n").with("link", "http://other");
        assert!(tracker().was_affected(&evidence(), &after));
    }

    #[test]
    fn test_side_affect_wins_over_no_affect() {
        let after = evidence()
            .with("notes", "n")
            .with("access_control_list", vec![5]);
        assert!(tracker().was_affected(&evidence(), &after));
    }

    #[test]
    fn test_new_object_affects() {
        assert!(tracker().was_affected(&AttributeSnapshot::new(), &evidence()));
    }

    #[test]
    fn test_bookkeeping_only_or_nothing_affects() {
        let after = evidence().with("updated_at", "2021-01-01 00:00:00");
        assert!(tracker().was_affected(&evidence(), &after));
        assert!(tracker().was_affected(&evidence(), &evidence()));
    }

    #[test]
    fn test_unknown_pair_has_only_base_fields() {
        let tracker = StatusAffectedChanges::new(ObjectKind::Comment, ObjectKind::Assessment);
        assert_eq!(tracker.rules(), AffectRules::default());
        let after = evidence().with("notes", "n");
        assert!(tracker.was_affected(&evidence(), &after));
    }

    #[test]
    fn test_changed_fields_includes_one_sided() {
        let before = AttributeSnapshot::new().with("a", 1).with("b", 2);
        let after = AttributeSnapshot::new().with("b", 3).with("c", 4);
        let changed: Vec<String> = before.changed_fields(&after).into_iter().collect();
        assert_eq!(changed, vec!["a", "b", "c"]);
    }
}
