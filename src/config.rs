//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::HttpSettings;
use crate::notifications::DeliveryPolicy;
use crate::stream::{ReconnectPolicy, TransportConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Queue server location and request limits
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_stream_path")]
    pub stream_path: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_stream_path() -> String {
    "/api/data-stream/".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Reconnect behaviour of the event stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectMode {
    Never,
    #[default]
    Backoff,
}

/// Event stream configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub reconnect: ReconnectMode,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    1000 // 1 second
}

fn default_max_backoff() -> u64 {
    30_000 // 30 seconds
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectMode::default(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Notification presentation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub delivery: DeliveryPolicy,
}

/// Session authentication
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Value of the session cookie of a logged-in user
    pub session_cookie: Option<String>,

    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,

    /// Fixed anti-forgery token; when unset it is read from the page at
    /// `csrf_page_path`
    pub csrf_token: Option<String>,

    #[serde(default = "default_csrf_page_path")]
    pub csrf_page_path: String,
}

fn default_session_cookie_name() -> String {
    "sessionid".to_string()
}

fn default_csrf_page_path() -> String {
    "/".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie: None,
            session_cookie_name: default_session_cookie_name(),
            csrf_token: None,
            csrf_page_path: default_csrf_page_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("waitline").join("config.toml")),
            Some(PathBuf::from("/etc/waitline/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(url) = lookup("WAITLINE_BASE_URL") {
            self.server.base_url = url;
        }
        if let Some(path) = lookup("WAITLINE_STREAM_PATH") {
            self.server.stream_path = path;
        }

        // Auth overrides
        if let Some(cookie) = lookup("WAITLINE_SESSION_COOKIE") {
            self.auth.session_cookie = Some(cookie);
        }
        if let Some(token) = lookup("WAITLINE_CSRF_TOKEN") {
            self.auth.csrf_token = Some(token);
        }

        // Logging overrides
        if let Some(level) = lookup("WAITLINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("WAITLINE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Full URL of the event stream
    pub fn stream_url(&self) -> String {
        join_url(&self.server.base_url, &self.server.stream_path)
    }

    /// Full URL of the page carrying the CSRF meta tag
    pub fn csrf_page_url(&self) -> String {
        join_url(&self.server.base_url, &self.auth.csrf_page_path)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        match self.stream.reconnect {
            ReconnectMode::Never => ReconnectPolicy::Never,
            ReconnectMode::Backoff => ReconnectPolicy::Backoff {
                max_attempts: self.stream.max_reconnect_attempts,
                initial_delay: Duration::from_millis(self.stream.initial_backoff_ms),
                max_delay: Duration::from_millis(self.stream.max_backoff_ms),
            },
        }
    }

    pub fn transport_config(&self) -> TransportConfig {
        let mut config = TransportConfig::new(self.stream_url()).policy(self.reconnect_policy());
        config.channel_capacity = self.stream.channel_capacity;
        config
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            base_url: self.server.base_url.clone(),
            connect_timeout: Duration::from_secs(self.server.connect_timeout_secs),
            session_cookie: self
                .auth
                .session_cookie
                .clone()
                .map(|value| (self.auth.session_cookie_name.clone(), value)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Waitline Configuration
#
# Environment variables override these settings:
# - WAITLINE_BASE_URL
# - WAITLINE_STREAM_PATH
# - WAITLINE_SESSION_COOKIE
# - WAITLINE_CSRF_TOKEN
# - WAITLINE_LOG_LEVEL
# - WAITLINE_LOG_FORMAT

[server]
# Queue server base URL
base_url = "http://localhost:8000"

# Path of the live data stream
stream_path = "/api/data-stream/"

# Timeout for acknowledgment and polling requests (seconds)
request_timeout_secs = 10

# Connection timeout (seconds)
connect_timeout_secs = 5

[stream]
# What to do when the stream drops: never or backoff
reconnect = "backoff"

# Consecutive failed attempts before giving up
max_reconnect_attempts = 5

# First reconnect delay, doubled on each failure (ms)
initial_backoff_ms = 1000

# Upper bound of the reconnect delay (ms)
max_backoff_ms = 30000

# Frames buffered between the stream and the dashboard
channel_capacity = 64

[notifications]
# overwrite: a new notification replaces the one showing
# queue: notifications are shown one at a time, oldest first
delivery = "overwrite"

[auth]
# Session cookie of a logged-in user
# session_cookie = ""
session_cookie_name = "sessionid"

# Fixed CSRF token; when unset it is read from the page below
# csrf_token = ""
csrf_page_path = "/"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: compact, pretty or json
format = "compact"

# Optional log file path
# file = "/var/log/waitline/waitline.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stream_url(), "http://localhost:8000/api/data-stream/");
        assert_eq!(config.notifications.delivery, DeliveryPolicy::Overwrite);
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
        assert_eq!(config.http_settings().session_cookie, None);
    }

    #[test]
    fn test_generated_config_parses_to_defaults() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        let defaults = Config::default();

        assert_eq!(config.server.base_url, defaults.server.base_url);
        assert_eq!(config.server.stream_path, defaults.server.stream_path);
        assert_eq!(config.reconnect_policy(), defaults.reconnect_policy());
        assert_eq!(config.stream.channel_capacity, 64);
        assert_eq!(config.logging.format, "compact");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
base_url = "https://queues.example.org/"

[stream]
reconnect = "never"

[notifications]
delivery = "queue"

[auth]
session_cookie = "abc123"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.stream_url(),
            "https://queues.example.org/api/data-stream/"
        );
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::Never);
        assert_eq!(config.notifications.delivery, DeliveryPolicy::Queue);
        assert_eq!(
            config.http_settings().session_cookie,
            Some(("sessionid".to_string(), "abc123".to_string()))
        );
        assert_eq!(config.csrf_page_url(), "https://queues.example.org/");
    }

    #[test]
    fn test_transport_config_from_stream_section() {
        let config: Config = toml::from_str(
            r#"
[stream]
max_reconnect_attempts = 2
initial_backoff_ms = 250
max_backoff_ms = 1000
channel_capacity = 8
"#,
        )
        .unwrap();

        let transport = config.transport_config();
        assert_eq!(transport.channel_capacity, 8);
        assert_eq!(
            transport.policy,
            ReconnectPolicy::Backoff {
                max_attempts: 2,
                initial_delay: Duration::from_millis(250),
                max_delay: Duration::from_secs(1),
            }
        );
    }

    #[test]
    fn test_invalid_file_errors() {
        let missing = Config::load(Path::new("/nonexistent/waitline.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[stream]\nreconnect = \"sometimes\"").unwrap();
        let invalid = Config::load(file.path()).unwrap_err();
        assert!(matches!(invalid, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WAITLINE_BASE_URL", "http://10.0.0.5:9000"),
            ("WAITLINE_STREAM_PATH", "/stream/"),
            ("WAITLINE_CSRF_TOKEN", "tok"),
            ("WAITLINE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.stream_url(), "http://10.0.0.5:9000/stream/");
        assert_eq!(config.auth.csrf_token.as_deref(), Some("tok"));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.auth.session_cookie, None);
    }
}
