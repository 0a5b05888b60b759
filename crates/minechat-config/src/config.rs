//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Server endpoints and credentials.
    pub connection: ConnectionConfig,
    /// Timeouts and intervals.
    pub timing: TimingConfig,
    /// Chat history persistence.
    pub history: HistoryConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Server endpoints and credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Chat server hostname.
    pub host: String,
    /// Port streaming broadcast messages.
    pub read_port: u16,
    /// Port accepting authentication and outgoing messages.
    pub send_port: u16,
    /// Auth token. Empty means unregistered: the client registers on first
    /// connect and writes the issued token back here.
    pub token: Option<String>,
    /// Display name used when registering a new account.
    pub user_name: String,
}

/// Timeouts and intervals, in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// Deadline for establishing a TCP connection.
    pub connect_timeout_secs: u64,
    /// Deadline for each broadcast line read.
    pub read_timeout_secs: u64,
    /// Longest tolerated gap between liveness events.
    pub watchdog_timeout_secs: u64,
    /// Delay between keepalive pings.
    pub ping_interval_secs: u64,
    /// Fixed backoff between failed connection attempts.
    pub reconnect_interval_secs: u64,
}

/// Chat history persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// File the received chat lines are appended to and replayed from.
    pub path: PathBuf,
}

/// Debug/development settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "minechat.dvmn.org".to_string(),
            read_port: 5000,
            send_port: 5050,
            token: None,
            user_name: "anonymous".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            read_timeout_secs: 120,
            watchdog_timeout_secs: 120,
            ping_interval_secs: 60,
            reconnect_interval_secs: 5,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("minechat.history"),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Read {
                path: config_path.clone(),
                source: e,
            })?;
            let config: Config = ron::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: config_path.clone(),
                source: e,
            })?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|e| ConfigError::Write {
            path: config_path.clone(),
            source: e,
        })?;
        Ok(())
    }

    /// Persist a freshly registered token, leaving everything else in the
    /// stored config untouched.
    pub fn save_token(config_dir: &Path, token: &str) -> Result<(), ConfigError> {
        let mut stored = Config::load_or_create(config_dir)?;
        stored.connection.token = Some(token.to_string());
        stored.save(config_dir)?;
        log::info!("Token written back to config");
        Ok(())
    }
}

/// Default per-user config directory for the client.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join("minechat"))
        .ok_or(ConfigError::NoConfigDir)
}
