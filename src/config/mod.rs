use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::LiveSource;

pub mod defaults;
pub mod duration_serde;
pub mod store;

use defaults::*;

pub use store::{ConfigStore, FileConfigStore, MemoryConfigStore};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub live_sources: Vec<LiveSource>,
}

/// HTTP and EPG behaviour of the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestionConfig {
    /// User-agent for playlist and EPG fetches without an override
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// User-agent for TVBox `lives` entries that carry no `ua`
    #[serde(default = "default_tvbox_user_agent")]
    pub tvbox_user_agent: String,
    #[serde(default = "default_connect_timeout", with = "duration_serde::duration")]
    pub connect_timeout: Duration,
    /// Total request timeout; also bounds a streamed EPG download
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_epg_enabled")]
    pub epg_enabled: bool,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_tvbox_user_agent() -> String {
    DEFAULT_TVBOX_USER_AGENT.to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

fn default_epg_enabled() -> bool {
    DEFAULT_EPG_ENABLED
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            tvbox_user_agent: default_tvbox_user_agent(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            epg_enabled: default_epg_enabled(),
        }
    }
}

impl Config {
    /// Config file to use: `explicit`, else `$LIVE_INGEST_CONFIG`, else `config.toml`
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        explicit
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_FILE_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string())
            .into()
    }

    pub fn load_from_file(config_file: impl AsRef<Path>) -> AppResult<Self> {
        let path = config_file.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let default_config = Self::default();
            std::fs::write(path, default_config.to_toml()?)?;
            info!("Created default config file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn from_toml(contents: &str) -> AppResult<Self> {
        toml::from_str(contents)
            .map_err(|e| AppError::configuration(format!("Invalid config document: {e}")))
    }

    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::configuration(format!("Failed to serialize config: {e}")))
    }

    /// Reject duplicate keys and descriptors that can never be fetched
    pub fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for source in &self.live_sources {
            source.validate()?;
            if !seen.insert(source.key.as_str()) {
                return Err(AppError::configuration(format!(
                    "Duplicate live source key '{}'",
                    source.key
                )));
            }
        }
        Ok(())
    }

    pub fn live_source(&self, key: &str) -> Option<&LiveSource> {
        self.live_sources.iter().find(|source| source.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_ingestion_fields() {
        let config = Config::from_toml(
            r#"
[ingestion]
connect_timeout = "3s"

[[live_sources]]
key = "cn"
name = "CN"
url = "http://example.com/live.m3u"
"#,
        )
        .unwrap();

        assert_eq!(config.ingestion.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.ingestion.tvbox_user_agent, DEFAULT_TVBOX_USER_AGENT);
        assert!(config.ingestion.epg_enabled);
        assert_eq!(config.live_sources.len(), 1);
        assert!(!config.live_sources[0].disabled);
    }

    #[test]
    fn test_toml_round_trip_keeps_channel_number() {
        let mut config = Config::default();
        let mut source = LiveSource::new("cn", "CN", "http://example.com/live.m3u");
        source.channel_number = 42;
        source.user_agent = Some("okhttp/4.9".to_string());
        config.live_sources.push(source);

        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_duplicate_keys() {
        let mut config = Config::default();
        config
            .live_sources
            .push(LiveSource::new("cn", "CN", "http://a/live.m3u"));
        config
            .live_sources
            .push(LiveSource::new("cn", "CN 2", "http://b/live.m3u"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            Config::resolve_path(Some("/etc/live-ingest.toml")),
            PathBuf::from("/etc/live-ingest.toml")
        );
    }

    #[test]
    fn test_load_from_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::load_from_file(&path).unwrap();
        assert!(path.exists());
        assert!(config.live_sources.is_empty());
    }
}
