//! core::config::schema
//!
//! On-disk configuration schema.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$PR_BULLET_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/pr-bullet/config.toml`
//! 3. `~/.pr-bullet/config.toml`
//!
//! The GitHub token is never read from this file.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// User configuration file.
///
/// # Example
///
/// ```toml
/// api_url = "https://github.example.com/api/v3"
/// blob_concurrency = 8
/// connect_timeout_secs = 5
/// request_timeout_secs = 30
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// REST API base URL (GitHub Enterprise)
    pub api_url: Option<String>,

    /// Maximum number of blob uploads in flight per target
    pub blob_concurrency: Option<usize>,

    /// TCP connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Whole-request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.api_url {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "api_url cannot be empty".to_string(),
                ));
            }
        }

        if self.blob_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue(
                "blob_concurrency must be at least 1".to_string(),
            ));
        }

        if self.connect_timeout_secs == Some(0) || self.request_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "timeouts must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_keys() {
        let config: FileConfig = toml::from_str(
            r#"
            api_url = "https://github.example.com/api/v3"
            blob_concurrency = 8
            connect_timeout_secs = 3
            request_timeout_secs = 20
            "#,
        )
        .unwrap();

        assert_eq!(
            config.api_url.as_deref(),
            Some("https://github.example.com/api/v3")
        );
        assert_eq!(config.blob_concurrency, Some(8));
        assert_eq!(config.connect_timeout_secs, Some(3));
        assert_eq!(config.request_timeout_secs, Some(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_file_is_default() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn rejects_unknown_fields() {
        let result: Result<FileConfig, _> = toml::from_str("token = \"ghp_secret\"");
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let config = FileConfig {
            blob_concurrency: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_timeouts() {
        let config = FileConfig {
            request_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_blank_api_url() {
        let config = FileConfig {
            api_url: Some("  ".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
