//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use courier_core::BotCredentials;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Long-polling settings shared by all bots.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Individual bot configurations.
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

impl CourierConfig {
    /// Returns the configuration of the bot called `name`.
    pub fn bot(&self, name: &str) -> Option<&BotConfig> {
        self.bots.iter().find(|bot| bot.name == name)
    }

    /// Returns the credentials of the enabled bot called `name`.
    ///
    /// This is the credential lookup handed to the controller binder.
    pub fn credentials(&self, name: &str) -> Option<BotCredentials> {
        self.bot(name)
            .filter(|bot| bot.enabled)
            .map(BotConfig::credentials)
    }

    /// Iterates over the enabled bots.
    pub fn enabled_bots(&self) -> impl Iterator<Item = &BotConfig> {
        self.bots.iter().filter(|bot| bot.enabled)
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line output without span context.
    #[default]
    Compact,
    /// Single-line output with span context.
    Full,
    /// Multi-line human-friendly output.
    Pretty,
    /// Newline-delimited JSON (requires the `json-log` feature).
    #[cfg(feature = "json-log")]
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Write to `logging.file_path`.
    File,
}

/// Rotation policy for file output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level. `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    /// Line format.
    #[serde(default)]
    pub format: LogFormat,

    /// Destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Span lifecycle events.
    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file path, required for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Rotation of the log file.
    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-module levels, e.g. `courier_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            rotation: LogRotation::Never,
            filters: BTreeMap::new(),
        }
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Long-polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Server-side long-poll timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of updates per batch (1 to 100).
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Delay before polling again after a failed poll, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl PollingConfig {
    /// The long-poll timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            limit: default_limit(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_limit() -> u32 {
    100
}

fn default_retry_delay_ms() -> u64 {
    5000
}

// =============================================================================
// Bots
// =============================================================================

/// Individual bot configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot name controllers refer to. The empty name is the default bot.
    #[serde(default)]
    pub name: String,

    /// API token.
    pub token: String,

    /// Public username of the bot.
    #[serde(default)]
    pub username: String,

    /// Base URL of the Bot API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Whether this bot is started.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl BotConfig {
    /// Creates an enabled bot configuration.
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            username: String::new(),
            api_url: default_api_url(),
            enabled: true,
        }
    }

    /// The credentials of this bot.
    pub fn credentials(&self) -> BotCredentials {
        BotCredentials::new(self.token.clone(), self.username.clone())
    }

    /// The name used in log output.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "<default>" } else { &self.name }
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("api_url", &self.api_url)
            .field("enabled", &self.enabled)
            .finish()
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_only_for_enabled_bots() {
        let mut disabled = BotConfig::new("ops", "2:ops");
        disabled.enabled = false;
        let config = CourierConfig {
            bots: vec![BotConfig::new("", "1:main"), disabled],
            ..Default::default()
        };

        let creds = config.credentials("").unwrap();
        assert_eq!(creds.token, "1:main");
        assert!(config.credentials("ops").is_none());
        assert!(config.credentials("missing").is_none());
        assert_eq!(config.enabled_bots().count(), 1);
    }

    #[test]
    fn test_bot_debug_redacts_token() {
        let bot = BotConfig::new("main", "123:secret");
        assert!(!format!("{bot:?}").contains("secret"));
    }

    #[test]
    fn test_polling_defaults() {
        let polling = PollingConfig::default();
        assert_eq!(polling.timeout(), Duration::from_secs(30));
        assert_eq!(polling.limit, 100);
        assert_eq!(polling.retry_delay(), Duration::from_millis(5000));
    }
}
