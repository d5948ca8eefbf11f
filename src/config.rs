use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default backend URL (local development stack)
const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:54321";

/// Client configuration wrapper.
///
/// Defaults come from [`AppConfig`], optionally a TOML file, and finally
/// `STRAYWATCH_*` environment variables. `Default` is the built-in
/// defaults only, without the environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Defaults plus environment overrides, validated
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_overrides(AppConfig::default(), env_var)
    }

    /// Apply overrides looked up by variable name, then validate
    pub fn with_overrides(
        mut app: AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        apply_overrides(&mut app, lookup);
        app.validate()?;
        Ok(Self { app })
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        let app = builder.build()?;
        Ok(Self { app })
    }

    /// Load a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let app: AppConfig = toml::from_str(&raw)?;
        Self::with_overrides(app, env_var)
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn backend_url(&self) -> &str {
        self.app.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.app.api_key.as_deref()
    }

    pub fn reports_table(&self) -> &str {
        &self.app.reports_table
    }

    pub fn public_view(&self) -> &str {
        &self.app.public_view
    }

    pub fn photo_bucket(&self) -> &str {
        &self.app.photo_bucket
    }

    pub fn max_retries(&self) -> u32 {
        self.app.max_retries
    }

    pub fn commit_timeout(&self) -> Duration {
        Duration::from_secs(self.app.commit_timeout_secs)
    }

    pub fn log_filter(&self) -> &str {
        &self.app.log_filter
    }

    /// Local store file path
    ///
    /// Uses the system's data directory when no path is configured.
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.app.store_path {
            return path.clone();
        }
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("straywatch");
        path.push("offline.db");
        path
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn apply_overrides(app: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("STRAYWATCH_BACKEND_URL") {
        app.backend_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(key) = lookup("STRAYWATCH_API_KEY") {
        app.api_key = Some(key);
    }
    if let Some(path) = lookup("STRAYWATCH_STORE_PATH") {
        app.store_path = Some(PathBuf::from(path));
    }
    if let Some(filter) = lookup("RUST_LOG") {
        app.log_filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::with_overrides(
            AppConfig::default(),
            vars(&[
                ("STRAYWATCH_BACKEND_URL", "https://example.supabase.co/"),
                ("STRAYWATCH_API_KEY", "anon"),
                ("RUST_LOG", "debug"),
            ]),
        )
        .unwrap();
        assert_eq!(config.backend_url(), "https://example.supabase.co");
        assert_eq!(config.api_key(), Some("anon"));
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_invalid_backend_url_override_is_rejected() {
        let result = Config::with_overrides(
            AppConfig::default(),
            vars(&[("STRAYWATCH_BACKEND_URL", "ftp://x")]),
        );
        assert!(matches!(result, Err(ConfigError::InvalidUrl(url)) if url == "ftp://x"));
    }

    #[test]
    fn test_default_ignores_environment() {
        assert_eq!(Config::default().backend_url(), DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_explicit_store_path_wins() {
        let config =
            Config::with_builder(AppConfig::builder().store_path("/tmp/x/offline.db")).unwrap();
        assert_eq!(config.store_path(), PathBuf::from("/tmp/x/offline.db"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "photo_bucket = \"rescue-pics\"\ncommit_timeout_secs = 5").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.photo_bucket(), "rescue-pics");
        assert_eq!(config.commit_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_retries = 0").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
