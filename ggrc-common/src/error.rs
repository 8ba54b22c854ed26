//! Common error types for GGRC

use thiserror::Error;

/// Common result type for GGRC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the GGRC crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bulk operation result could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),
}
