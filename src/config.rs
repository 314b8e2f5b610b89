use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exceptions::EXCEPTIONS_FILE;
use crate::pagination::DEFAULT_MAX_PAGES;
use crate::ruleset::DEFAULT_RULESET;
use crate::session::{RetryPolicy, SessionConfig, GITHUB_API_URL};

/// Main configuration structure for reporule
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Directory holding ruleset definitions and the exception list
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitHubConfig {
    /// REST API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Ruleset applied when --ruleset is not given
    #[serde(default = "default_ruleset")]
    pub default_ruleset: String,

    /// Maximum pages followed on any list endpoint
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

/// HTTP transport configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Per-request timeout in seconds, 0 disables it
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retry policy for transient failures
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "auto", "pretty", "json"
}

// Default value functions
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_api_url() -> String {
    GITHUB_API_URL.to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_ruleset() -> String {
    DEFAULT_RULESET.to_string()
}
fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}
fn default_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "auto".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
            default_ruleset: default_ruleset(),
            max_pages: default_max_pages(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            github: GitHubConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or use built-in defaults
    pub fn load_or_default() -> Result<Self> {
        match Self::default_config_path() {
            Ok(config_path) if config_path.exists() => Self::load(&config_path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("reporule").join("config.yml"))
    }

    /// Expand environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.data_dir = shellexpand::full(&self.data_dir)
            .context("Failed to expand data_dir path")?
            .into_owned();

        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Path of the exception list inside the data directory
    pub fn exceptions_path(&self) -> PathBuf {
        self.data_dir().join(EXCEPTIONS_FILE)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.http.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Read the bearer token from the configured environment variable
    pub fn token_from_env(&self) -> Option<String> {
        std::env::var(&self.github.token_env)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Session settings for the given token
    pub fn session_config(&self, token: Option<String>) -> SessionConfig {
        SessionConfig {
            api_url: self.github.api_url.clone(),
            token,
            retry: self.http.retry.clone(),
            timeout: self.request_timeout(),
        }
    }
}
