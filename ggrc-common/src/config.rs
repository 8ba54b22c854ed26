//! Configuration loading
//!
//! Settings are resolved in this priority order:
//! 1. Command-line argument / environment variable (clap handles both)
//! 2. TOML config file
//! 3. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default listen address for the bulk operations service
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5730";

/// Default base URL used when building links to assessments
pub const DEFAULT_APP_URL: &str = "http://localhost:8080";

/// Default log level when neither TOML nor RUST_LOG provide one
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DATABASE_FILE_NAME: &str = "ggrc.db";

/// Bootstrap configuration read from the TOML file
///
/// Every key is optional; missing keys fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Socket address to listen on (e.g. "127.0.0.1:5730")
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Base URL of the GGRC web application, used in notification links
    #[serde(default)]
    pub app_url: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

/// Values supplied on the command line or via environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub app_url: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub app_url: String,
    pub log_level: String,
}

impl Config {
    /// Resolve configuration from overrides, the TOML file and defaults
    ///
    /// A missing config file is not an error: defaults are used and a
    /// warning is logged. A config file that exists but cannot be parsed
    /// is an error.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let config_path = overrides.config_file.clone().or_else(default_config_path);

        let toml_config = match config_path {
            Some(path) => load_toml_config(&path)?.unwrap_or_default(),
            None => {
                warn!("Could not determine config directory, using defaults");
                TomlConfig::default()
            }
        };

        Ok(Self::from_parts(toml_config, overrides))
    }

    /// Merge an already parsed TOML config with overrides
    pub fn from_parts(toml_config: TomlConfig, overrides: ConfigOverrides) -> Self {
        let database_path = overrides
            .database_path
            .or(toml_config.database_path)
            .unwrap_or_else(|| default_data_dir().join(DATABASE_FILE_NAME));

        let bind_address = overrides
            .bind_address
            .or(toml_config.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let app_url = overrides
            .app_url
            .or(toml_config.app_url)
            .unwrap_or_else(|| DEFAULT_APP_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let log_level = toml_config
            .logging
            .level
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Self {
            database_path,
            bind_address,
            app_url,
            log_level,
        }
    }
}

/// Read and parse a TOML config file
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found: {} (using defaults)", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    info!("Loaded config file: {}", path.display());
    Ok(Some(config))
}

/// Platform config file location (`<config dir>/ggrc/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ggrc").join("config.toml"))
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("ggrc"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/ggrc"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("ggrc"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/ggrc"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("ggrc"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\ggrc"))
    } else {
        PathBuf::from("./ggrc_data")
    }
}

/// Validate that the bind address parses as a socket address
pub fn parse_bind_address(bind_address: &str) -> Result<std::net::SocketAddr> {
    bind_address
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address '{}': {}", bind_address, e)))
}
