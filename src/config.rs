//! Configuration module for the scrapper.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ScrapperError};

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/scrapper.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file output.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/scrapper.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// What to do with a link's `last_checked_at` when its source is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceFailurePolicy {
    /// Advance `last_checked_at`; the link is retried once it is stale again.
    #[default]
    Advance,
    /// Leave the link untouched; it is retried on the very next cycle.
    Retain,
}

/// Link updater configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdaterConfig {
    /// Whether the background updater runs.
    #[serde(default = "default_updater_enabled")]
    pub enabled: bool,
    /// Seconds between two update cycles.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// A link is stale once it was last checked longer ago than this.
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold_secs: u64,
    /// Maximum number of links checked at the same time.
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
    /// Upper bound for a single detector or notifier call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timestamp policy for unreachable sources.
    #[serde(default)]
    pub source_failure_policy: SourceFailurePolicy,
}

fn default_updater_enabled() -> bool {
    true
}

fn default_check_interval() -> u64 {
    60
}

fn default_stale_threshold() -> u64 {
    86_400 // 1 day
}

fn default_max_concurrent_checks() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            enabled: default_updater_enabled(),
            check_interval_secs: default_check_interval(),
            stale_threshold_secs: default_stale_threshold(),
            max_concurrent_checks: default_max_concurrent_checks(),
            request_timeout_secs: default_request_timeout(),
            source_failure_policy: SourceFailurePolicy::default(),
        }
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Base URL of the REST API.
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
        }
    }
}

/// Stack Exchange API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StackOverflowConfig {
    /// Base URL of the versioned API.
    #[serde(default = "default_stackoverflow_api_url")]
    pub api_url: String,
    /// Stack Exchange site parameter.
    #[serde(default = "default_stackoverflow_site")]
    pub site: String,
}

fn default_stackoverflow_api_url() -> String {
    "https://api.stackexchange.com/2.3".to_string()
}

fn default_stackoverflow_site() -> String {
    "stackoverflow".to_string()
}

impl Default for StackOverflowConfig {
    fn default() -> Self {
        Self {
            api_url: default_stackoverflow_api_url(),
            site: default_stackoverflow_site(),
        }
    }
}

/// Bot (notification receiver) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Base URL of the bot's update endpoint.
    #[serde(default = "default_bot_url")]
    pub url: String,
}

fn default_bot_url() -> String {
    "http://localhost:8090".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            url: default_bot_url(),
        }
    }
}

/// Outbound HTTP client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("scrapper/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_redirects() -> usize {
    5
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

/// Display configuration for rendered summaries.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Timezone for timestamps in summaries (e.g., "UTC", "Europe/Moscow").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Link updater configuration.
    #[serde(default)]
    pub updater: UpdaterConfig,
    /// GitHub API configuration.
    #[serde(default)]
    pub github: GithubConfig,
    /// Stack Exchange API configuration.
    #[serde(default)]
    pub stackoverflow: StackOverflowConfig,
    /// Bot configuration.
    #[serde(default)]
    pub bot: BotConfig,
    /// HTTP client configuration.
    #[serde(default)]
    pub http: HttpConfig,
    /// Display configuration.
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ScrapperError::Io)?;
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
        toml::from_str(s).map_err(|e| ScrapperError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SCRAPPER_DATABASE_PATH`: Override the database path
    /// - `SCRAPPER_BOT_URL`: Override the bot base URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("SCRAPPER_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(url) = std::env::var("SCRAPPER_BOT_URL") {
            if !url.is_empty() {
                self.bot.url = url;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let updater = &self.updater;
        if updater.stale_threshold_secs == 0 {
            return Err(ScrapperError::Config(
                "updater.stale_threshold_secs must be positive".to_string(),
            ));
        }
        if updater.check_interval_secs == 0 {
            return Err(ScrapperError::Config(
                "updater.check_interval_secs must be positive".to_string(),
            ));
        }
        if updater.max_concurrent_checks == 0 {
            return Err(ScrapperError::Config(
                "updater.max_concurrent_checks must be positive".to_string(),
            ));
        }
        if updater.request_timeout_secs == 0 {
            return Err(ScrapperError::Config(
                "updater.request_timeout_secs must be positive".to_string(),
            ));
        }

        if self.display.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ScrapperError::Config(format!(
                "unknown timezone: {}",
                self.display.timezone
            )));
        }

        for (name, value) in [
            ("github.api_url", &self.github.api_url),
            ("stackoverflow.api_url", &self.stackoverflow.api_url),
            ("bot.url", &self.bot.url),
        ] {
            validate_http_url(name, value)?;
        }

        Ok(())
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| ScrapperError::Config(format!("{name} is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ScrapperError::Config(format!(
            "{name} has unsupported scheme: {scheme}"
        ))),
    }
}
