use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub captions: CaptionConfig,
    pub storage: StorageConfig,
    pub relay: RelayConfig,
    pub page: PageConfig,
    pub discovery: DiscoveryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// How often open sessions are refreshed and written to the recovery area.
    pub heartbeat_interval_ms: u64,
    /// Number of meeting rooms kept in the recent-meetings record.
    pub max_meetings: usize,
    /// History entries kept per meeting room.
    pub max_history: usize,
    /// Host name that serves meeting rooms.
    pub meeting_host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Delay before a caller blocked on the storage lock tries again.
    pub lock_retry_ms: u64,
    /// Overrides the default database location.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub active_tab_retries: u32,
    pub active_tab_retry_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Endpoint that redirects to a freshly allocated meeting room.
    pub new_meeting_url: String,
    pub default_count: usize,
    /// Largest count a single run accepts.
    pub max_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 1000,
            max_meetings: 10,
            max_history: 10,
            meeting_host: "meet.google.com".to_string(),
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_retry_ms: 100,
            db_path: None,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            active_tab_retries: 5,
            active_tab_retry_ms: 500,
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            new_meeting_url: "https://meet.google.com/new".to_string(),
            default_count: 10,
            max_count: crate::discovery::DEFAULT_MAX_COUNT,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3838 }
    }
}

impl TrackerConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl CaptionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl StorageConfig {
    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }
}

impl RelayConfig {
    pub fn active_tab_retry(&self) -> Duration {
        Duration::from_millis(self.active_tab_retry_ms)
    }
}

impl PageConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Database location, honouring `storage.db_path` when set.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(path.clone()),
            None => global::db_file(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_intervals() {
        let config = Config::default();
        assert_eq!(config.tracker.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(config.captions.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.storage.lock_retry(), Duration::from_millis(100));
        assert_eq!(config.relay.active_tab_retries, 5);
        assert_eq!(config.page.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.tracker.max_meetings, 10);
        assert_eq!(config.tracker.max_history, 10);
        assert_eq!(config.discovery.max_count, 50);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [tracker]
            meeting_host = "meet.example.com"

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.tracker.meeting_host, "meet.example.com");
        assert_eq!(config.tracker.heartbeat_interval_ms, 1000);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.captions.poll_interval_ms, 500);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.discovery.new_meeting_url, config.discovery.new_meeting_url);
    }
}
