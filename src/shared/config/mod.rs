//! Application configuration module
//!
//! Provides the plain configuration record, its builder and validation.
//! Loading from files and the environment lives in [`crate::config`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::shared::report::ReportCategory;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL
    pub backend_url: Option<String>,
    /// API key sent with every backend request
    pub api_key: Option<String>,
    /// Table reports are inserted into
    pub reports_table: String,
    /// Public view approved reports are read from
    pub public_view: String,
    /// Object-store bucket for photos
    pub photo_bucket: String,
    /// Local store file; `None` picks the platform data dir
    pub store_path: Option<PathBuf>,
    /// Failed attempts after which an entry is left alone
    pub max_retries: u32,
    /// Upper bound for one report commit
    pub commit_timeout_secs: u64,
    /// Categories that are publicly visible without moderation
    pub auto_approved_categories: Vec<ReportCategory>,
    /// Default tracing filter
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_key: None,
            reports_table: "dogs".to_string(),
            public_view: "dogs_public".to_string(),
            photo_bucket: "dog-photos".to_string(),
            store_path: None,
            max_retries: 3,
            commit_timeout_secs: 30,
            auto_approved_categories: vec![ReportCategory::Save],
            log_filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.backend_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_retries",
                message: "must be at least 1".to_string(),
            });
        }
        if self.commit_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "commit_timeout_secs",
                message: "must be at least 1".to_string(),
            });
        }
        for (field, value) in [
            ("reports_table", &self.reports_table),
            ("public_view", &self.public_view),
            ("photo_bucket", &self.photo_bucket),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue(field));
            }
        }
        Ok(())
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the backend URL
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.config.backend_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the API key
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Set the local store path
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = Some(path.into());
        self
    }

    /// Set the photo bucket
    pub fn photo_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.config.photo_bucket = bucket.into();
        self
    }

    /// Set the retry ceiling
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the commit timeout in seconds
    pub fn commit_timeout_secs(mut self, secs: u64) -> Self {
        self.config.commit_timeout_secs = secs;
        self
    }

    /// Replace the auto-approved categories
    pub fn auto_approved_categories(mut self, categories: Vec<ReportCategory>) -> Self {
        self.config.auto_approved_categories = categories;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
