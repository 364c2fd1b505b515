//! Configuration management for Broadsheet.
//!
//! Configuration is read from `~/.config/broadsheet/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::fetcher::http_fetcher::DEFAULT_USER_AGENT;

pub const DEFAULT_FEED_URL: &str = "https://gist.githubusercontent.com/AtomicSpider/12b731e3e2a41f336cc1bd7fc904efbb/raw/3e6da3480b132f6d0eb99ca3711da4a2c901627e/data.json";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub store: StoreConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: String,
    pub user_agent: String,
    /// Overall request timeout; unset leaves the transport default
    pub timeout_secs: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub interval: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: "15m".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// A missing default config file is created with comments. A missing
    /// explicit path is an error. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_feed_url(&self.feed.url)?;
        parse_interval(&self.watch.interval)?;
        Ok(())
    }

    /// Get the default config file path: `~/.config/broadsheet/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("broadsheet").join("config.toml"))
    }

    /// Configured database path, or `<data dir>/broadsheet/broadsheet.db`.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.store.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("broadsheet").join("broadsheet.db"))
    }

    pub fn watch_interval(&self) -> Result<Duration, ConfigError> {
        parse_interval(&self.watch.interval)
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    fn default_config_content() -> String {
        format!(
            r##"# Broadsheet Configuration

[feed]
# JSON array feed of articles
url = "{url}"

# User-Agent sent with every request
user_agent = "{user_agent}"

# Overall request timeout in seconds. Leave unset to use the HTTP client
# default (no overall timeout).
# timeout_secs = 30

[store]
# SQLite database holding the cached snapshot.
# Defaults to the platform data directory.
# path = "/path/to/broadsheet.db"

[watch]
# How often `broadsheet watch` refreshes: "30s", "15m", "1h", "1d" or seconds
interval = "15m"
"##,
            url = DEFAULT_FEED_URL,
            user_agent = DEFAULT_USER_AGENT,
        )
    }
}

pub fn validate_feed_url(url: &str) -> Result<Url, ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidFeedUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidFeedUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Parse interval string like "1h", "30m", "6h", "1d", "45s" or raw seconds.
pub fn parse_interval(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim().to_lowercase();
    let invalid = || ConfigError::InvalidInterval(s.clone());

    let (digits, unit) = match s.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&s[..idx], c),
        _ => (s.as_str(), 's'),
    };

    let value = digits.trim().parse::<u64>().map_err(|_| invalid())?;
    let secs = match unit {
        's' => Some(value),
        'm' => value.checked_mul(60),
        'h' => value.checked_mul(3600),
        'd' => value.checked_mul(86400),
        _ => None,
    }
    .ok_or_else(invalid)?;

    if secs == 0 {
        return Err(invalid());
    }

    Ok(Duration::from_secs(secs))
}

/// Format interval for display
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid feed URL {url}: {reason}")]
    InvalidFeedUrl { url: String, reason: String },

    #[error("Invalid interval: {0}. Use format like '30s', '15m', '1h', '1d'")]
    InvalidInterval(String),
}
