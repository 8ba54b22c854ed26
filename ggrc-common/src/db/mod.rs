//! Database models and queries

pub mod assessments;
pub mod attributes;
pub mod evidence;
pub mod init;
pub mod models;
pub mod people;

pub use init::*;
pub use models::*;

/// Build a `?, ?, ?` placeholder list for an `IN (...)` clause
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
