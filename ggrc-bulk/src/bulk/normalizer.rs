//! Per-type value normalization
//!
//! Maps a raw value submitted by the bulk edit grid to the form the import
//! engine expects: checkboxes become "yes"/"no", person ids become emails,
//! everything else passes through. Type names are matched
//! case-insensitively.

use std::collections::HashMap;

use serde_json::Value;

pub const CHECKBOX_YES: &str = "yes";
pub const CHECKBOX_NO: &str = "no";

/// Custom attribute types known to GGRC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Text,
    RichText,
    Date,
    Checkbox,
    Dropdown,
    MultiselectDropdown,
    MapPerson,
    Other,
}

impl AttributeType {
    /// Parse a GGRC attribute type name, ignoring case
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" => AttributeType::Text,
            "rich text" => AttributeType::RichText,
            "date" => AttributeType::Date,
            "checkbox" => AttributeType::Checkbox,
            "dropdown" => AttributeType::Dropdown,
            "multiselect" => AttributeType::MultiselectDropdown,
            "map:person" => AttributeType::MapPerson,
            _ => AttributeType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Text => "Text",
            AttributeType::RichText => "Rich Text",
            AttributeType::Date => "Date",
            AttributeType::Checkbox => "Checkbox",
            AttributeType::Dropdown => "Dropdown",
            AttributeType::MultiselectDropdown => "Multiselect",
            AttributeType::MapPerson => "Map:Person",
            AttributeType::Other => "Other",
        }
    }
}

/// Person id to email lookup, prefetched before normalization
#[derive(Debug, Clone, Default)]
pub struct PeopleIndex {
    emails: HashMap<i64, String>,
}

impl PeopleIndex {
    pub fn new(emails: HashMap<i64, String>) -> Self {
        Self { emails }
    }

    pub fn email(&self, person_id: i64) -> Option<&str> {
        self.emails.get(&person_id).map(String::as_str)
    }
}

type NormalizeFn = fn(Option<&str>, &PeopleIndex) -> String;

/// Enum-keyed dispatch table of normalizing functions
///
/// Types without an entry use the raw pass-through.
#[derive(Clone)]
pub struct Normalizer {
    table: HashMap<AttributeType, NormalizeFn>,
}

impl Normalizer {
    pub fn new() -> Self {
        let mut table: HashMap<AttributeType, NormalizeFn> = HashMap::new();
        table.insert(AttributeType::Checkbox, normalize_checkbox);
        table.insert(AttributeType::MapPerson, normalize_person);
        Self { table }
    }

    /// Normalize `raw` according to the attribute type name
    pub fn normalize(
        &self,
        raw: Option<&str>,
        attribute_type: &str,
        people: &PeopleIndex,
    ) -> String {
        let kind = AttributeType::parse(attribute_type);
        let normalize = self.table.get(&kind).copied().unwrap_or(normalize_raw);
        normalize(raw, people)
    }
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("types", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The grid sends "0"/"1" for checkboxes
fn normalize_checkbox(raw: Option<&str>, _people: &PeopleIndex) -> String {
    if raw == Some("1") {
        CHECKBOX_YES.to_string()
    } else {
        CHECKBOX_NO.to_string()
    }
}

/// The grid sends a person id; the import engine wants an email.
/// Unknown people degrade to "" and are rejected downstream if mandatory.
fn normalize_person(raw: Option<&str>, people: &PeopleIndex) -> String {
    parse_person_id(raw)
        .and_then(|id| people.email(id))
        .unwrap_or_default()
        .to_string()
}

fn normalize_raw(raw: Option<&str>, _people: &PeopleIndex) -> String {
    raw.unwrap_or_default().to_string()
}

/// Numeric person id carried in a raw value, if any
pub fn parse_person_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

/// Text form of a JSON value submitted by the grid
///
/// `null` has no text form. Booleans map to the checkbox "1"/"0".
pub fn raw_value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
