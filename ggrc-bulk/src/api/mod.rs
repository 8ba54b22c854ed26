//! HTTP API handlers for ggrc-bulk

pub mod bulk;
pub mod cavs;
pub mod health;

pub use bulk::{bulk_complete, bulk_routes, bulk_save, bulk_verify};
pub use cavs::cavs_search;
pub use health::health_routes;
