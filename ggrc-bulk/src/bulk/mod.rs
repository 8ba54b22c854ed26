//! Bulk assessment operations
//!
//! Pipeline: request payload -> [`assembler`] (using [`normalizer`]) ->
//! [`csvbuilder`] blocks -> [`importer`]. [`aggregator`] serves the
//! read-only attribute matrix. [`service`] ties the steps together per
//! endpoint.

pub mod aggregator;
pub mod assembler;
pub mod csvbuilder;
pub mod importer;
pub mod normalizer;
pub mod service;
pub mod types;

pub use types::{BulkRequest, CavsSearchRequest};
