use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

/// Longest accepted `check_interval`, one year in seconds
pub const MAX_CHECK_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when neither RUST_LOG nor a CLI flag sets one
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of notified titles remembered for deduplication
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Contact address sent as `From` for sources with `identify = true`
    #[serde(default)]
    pub from: Option<String>,
    /// User-Agent sent for sources with `identify = true`
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            from: None,
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
        }
    }
}

/// Where notifications are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationBackend {
    /// Spawn a desktop notification command (notify-send compatible)
    Command,
    /// Only write notifications to the log
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_backend")]
    pub backend: NotificationBackend,
    /// Executable used by the command backend
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_icon")]
    pub app_icon: String,
    /// Expiry passed to the notification server, 0 = server default
    #[serde(default)]
    pub timeout_ms: u32,
    /// Minimum pause after each delivered notification, across all sources
    #[serde(default = "default_delay")]
    pub delay_secs: u64,
    /// Titles containing any of these require acknowledgement
    #[serde(default)]
    pub ack_keywords: Vec<String>,
    /// Message template; first line is the summary, the rest the body
    #[serde(default = "default_template")]
    pub template: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            command: default_command(),
            app_name: default_app_name(),
            app_icon: default_app_icon(),
            timeout_ms: 0,
            delay_secs: default_delay(),
            ack_keywords: Vec::new(),
            template: default_template(),
        }
    }
}

/// Feed format of a source, selects the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Xml,
    Atom,
    Reddit,
    Gmane,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceType::Rss => "rss",
            SourceType::Xml => "xml",
            SourceType::Atom => "atom",
            SourceType::Reddit => "reddit",
            SourceType::Gmane => "gmane",
        };
        f.write_str(name)
    }
}

/// A watched feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub feed: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// Seconds between the start of two polls
    pub check_interval: u64,
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    /// Send `From` and `User-Agent` from the [http] section
    #[serde(default)]
    pub identify: bool,
}

impl SourceConfig {
    /// Whether a title passes this source's keyword filter. Blank keywords
    /// are ignored; with none left every title passes.
    pub fn matches_keywords(&self, title: &str) -> bool {
        let mut keywords = self
            .keywords
            .iter()
            .flatten()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .peekable();
        if keywords.peek().is_none() {
            return true;
        }

        let title = title.to_lowercase();
        keywords.any(|keyword| title.contains(&keyword.to_lowercase()))
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_history_capacity() -> usize {
    1000
}

fn default_user_agent() -> String {
    concat!("secwatch/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_backend() -> NotificationBackend {
    NotificationBackend::Command
}

fn default_command() -> String {
    "notify-send".to_string()
}

fn default_app_name() -> String {
    "secwatch".to_string()
}

fn default_app_icon() -> String {
    "dialog-warning".to_string()
}

fn default_delay() -> u64 {
    5
}

fn default_template() -> String {
    "{source}\n{title}\n{link}".to_string()
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load and validate configuration from `path`, or the default location
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let config_path = path
            .map(expand_tilde)
            .unwrap_or_else(Self::config_path);

        if !config_path.exists() {
            return Err(crate::Error::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(
            "Loaded {} sources from {}",
            config.sources.len(),
            config_path.display()
        );
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    /// Always uses ~/.config/secwatch/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("secwatch")
            .join("config.toml")
    }

    /// Reject configurations the watcher cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error::Config;

        if self.sources.is_empty() {
            return Err(Config("no sources configured".to_string()));
        }
        if self.general.history_capacity == 0 {
            return Err(Config("general.history_capacity must be at least 1".to_string()));
        }
        if self.notification.backend == NotificationBackend::Command
            && self.notification.command.trim().is_empty()
        {
            return Err(Config("notification.command is empty".to_string()));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(Config(format!("source with feed '{}' has no name", source.feed)));
            }
            if !names.insert(source.name.as_str()) {
                return Err(Config(format!("duplicate source name '{}'", source.name)));
            }
            if source.check_interval == 0 || source.check_interval > MAX_CHECK_INTERVAL_SECS {
                return Err(Config(format!(
                    "source '{}': check_interval must be between 1 and {} seconds",
                    source.name, MAX_CHECK_INTERVAL_SECS
                )));
            }
            Url::parse(&source.feed).map_err(|e| {
                Config(format!("source '{}': invalid feed URL '{}': {}", source.name, source.feed, e))
            })?;
        }

        Ok(())
    }
}
