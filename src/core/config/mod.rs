//! core::config
//!
//! Configuration loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (see [`schema`] for locations)
//! 3. Environment (`GITHUB_API_URL`)
//! 4. CLI flags (not handled here)
//!
//! The bearer token comes only from `GITHUB_TOKEN`. A missing token is a
//! startup error, never a per-request one.
//!
//! # Example
//!
//! ```no_run
//! use pr_bullet::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("API: {}", config.api_url());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "GITHUB_API_URL";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "PR_BULLET_CONFIG";

/// Default GitHub API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default number of concurrent blob uploads per target.
pub const DEFAULT_BLOB_CONCURRENCY: usize = 4;

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default whole-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("env {0} is not set")]
    MissingToken(&'static str),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Resolved runtime configuration.
#[derive(Clone)]
pub struct Config {
    token: String,
    api_url: String,
    blob_concurrency: usize,
    connect_timeout: Duration,
    request_timeout: Duration,
    file_path: Option<PathBuf>,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("has_token", &!self.token.is_empty())
            .field("api_url", &self.api_url)
            .field("blob_concurrency", &self.blob_concurrency)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("file_path", &self.file_path)
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment and the config file.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingToken`] if `GITHUB_TOKEN` is unset or empty
    /// - read/parse/validation errors if a config file exists but is invalid
    pub fn load() -> Result<Self, ConfigError> {
        let (file, file_path) = match Self::find_file() {
            Some(path) => (Self::read_file(&path)?, Some(path)),
            None => (FileConfig::default(), None),
        };

        let mut config = Self::from_sources(
            file,
            std::env::var(TOKEN_ENV).ok(),
            std::env::var(API_URL_ENV).ok(),
        )?;
        config.file_path = file_path;
        Ok(config)
    }

    /// Combine a parsed config file with environment values.
    ///
    /// Kept separate from [`Config::load`] so precedence can be tested
    /// without touching the process environment.
    pub fn from_sources(
        file: FileConfig,
        token: Option<String>,
        api_url_env: Option<String>,
    ) -> Result<Self, ConfigError> {
        file.validate()?;

        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken(TOKEN_ENV))?;

        let api_url = api_url_env
            .filter(|u| !u.trim().is_empty())
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Self {
            token,
            api_url: normalize_api_url(&api_url),
            blob_concurrency: file.blob_concurrency.unwrap_or(DEFAULT_BLOB_CONCURRENCY),
            connect_timeout: file
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            file_path: None,
        })
    }

    /// Locate the config file, if any.
    fn find_file() -> Option<PathBuf> {
        // 1. Check $PR_BULLET_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/pr-bullet/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("pr-bullet/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.pr-bullet/config.toml
        let path = dirs::home_dir()?.join(".pr-bullet/config.toml");
        path.exists().then_some(path)
    }

    /// Read and parse a config file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// The bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// REST API base URL, without a trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Maximum concurrent blob uploads per target.
    pub fn blob_concurrency(&self) -> usize {
        self.blob_concurrency
    }

    /// TCP connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Whole-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Path of the config file that was loaded, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }
}

/// Strip trailing slashes so endpoint paths can be appended with `/`.
fn normalize_api_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
