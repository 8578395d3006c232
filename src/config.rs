//! Configuration module for fileupload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::file::{DEFAULT_MAX_READ_SIZE, WILDCARD_EXTENSION};
use crate::store::{is_valid_identifier, StoreValue};
use crate::{FileUploadError, Result};

/// Upload configuration.
///
/// These are the defaults every [`FileUploader`](crate::FileUploader) starts
/// from. Individual uploaders may override them through their builder methods.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Allowed extensions, lower-case. `"*"` allows everything.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Maximum file size in bytes (0 = unlimited).
    #[serde(default)]
    pub max_size: u64,
    /// Accept only files that decode as images.
    #[serde(default)]
    pub only_images: bool,
    /// Directory uploaded files are moved into.
    #[serde(default = "default_upload_directory")]
    pub directory: PathBuf,
    /// Insert a metadata row for every stored file.
    #[serde(default = "default_save_to_store")]
    pub save_to_store: bool,
    /// Extra columns merged into every metadata row.
    #[serde(default)]
    pub extra_fields: BTreeMap<String, StoreValue>,
}

fn default_allowed_extensions() -> Vec<String> {
    vec![WILDCARD_EXTENSION.to_string()]
}

fn default_upload_directory() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_save_to_store() -> bool {
    true
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_size: 0,
            only_images: false,
            directory: default_upload_directory(),
            save_to_store: default_save_to_store(),
            extra_fields: BTreeMap::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/files.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of bytes read per file by content search.
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
}

fn default_max_read_size() -> usize {
    DEFAULT_MAX_READ_SIZE
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_read_size: default_max_read_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Search configuration.
    #[serde(default)]
    pub search: SearchConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FileUploadError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FileUploadError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEUPLOAD_UPLOAD_DIR`: upload directory
    /// - `FILEUPLOAD_DATABASE_PATH`: SQLite database path
    /// - `FILEUPLOAD_LOG_LEVEL`: log level
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(dir) = non_empty_env("FILEUPLOAD_UPLOAD_DIR") {
            self.upload.directory = PathBuf::from(dir);
        }
        if let Some(path) = non_empty_env("FILEUPLOAD_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(level) = non_empty_env("FILEUPLOAD_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the allowed extension list is empty
    /// - an extra field name is not a plain SQL identifier
    /// - the search read cap is zero
    pub fn validate(&self) -> Result<()> {
        if self.upload.allowed_extensions.is_empty() {
            return Err(FileUploadError::Config(
                "upload.allowed_extensions is empty; use [\"*\"] to allow every extension"
                    .to_string(),
            ));
        }

        if let Some(name) = self
            .upload
            .extra_fields
            .keys()
            .find(|name| !is_valid_identifier(name))
        {
            return Err(FileUploadError::Config(format!(
                "upload.extra_fields: invalid column name {name:?}"
            )));
        }

        if self.search.max_read_size == 0 {
            return Err(FileUploadError::Config(
                "search.max_read_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}
