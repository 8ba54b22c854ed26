//! # GGRC Common Library
//!
//! Shared code for the GGRC bulk operations service:
//! - Database initialization, row models and shared queries
//! - Configuration loading (CLI / environment / TOML / defaults)
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
