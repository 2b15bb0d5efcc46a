//! External configuration store seam
//!
//! The pipeline reads `LiveSource` descriptors from the store and writes back a
//! single field, `channelNumber`, after every successful refresh. Persisting the
//! document is the store's concern; the file-backed store rewrites the whole
//! document on each update.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::Config;
use crate::errors::{AppError, AppResult};
use crate::models::LiveSource;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Look up one descriptor by key
    async fn live_source(&self, key: &str) -> AppResult<Option<LiveSource>>;

    /// All configured descriptors, disabled ones included
    async fn live_sources(&self) -> AppResult<Vec<LiveSource>>;

    /// Record the channel count of a successful refresh
    async fn save_channel_number(&self, key: &str, channel_number: usize) -> AppResult<()>;
}

/// TOML file backed store
pub struct FileConfigStore {
    path: PathBuf,
    config: RwLock<Config>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            path: path.into(),
            config: RwLock::new(config),
        }
    }

    /// Load (or create) the document at `path`
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let config = Config::load_from_file(path.as_ref())?;
        Ok(Self::new(path.as_ref(), config))
    }

    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn live_source(&self, key: &str) -> AppResult<Option<LiveSource>> {
        Ok(self.config.read().await.live_source(key).cloned())
    }

    async fn live_sources(&self) -> AppResult<Vec<LiveSource>> {
        Ok(self.config.read().await.live_sources.clone())
    }

    async fn save_channel_number(&self, key: &str, channel_number: usize) -> AppResult<()> {
        // Hold the write lock across the save so concurrent updates serialize
        let mut config = self.config.write().await;
        let source = config
            .live_sources
            .iter_mut()
            .find(|source| source.key == key)
            .ok_or_else(|| AppError::not_found("live_source", key))?;
        source.channel_number = channel_number;

        let contents = config.to_toml()?;
        tokio::fs::write(&self.path, contents).await?;
        debug!(
            "Saved channel_number={} for live source '{}' to {}",
            channel_number,
            key,
            self.path.display()
        );
        Ok(())
    }
}

/// In-memory store for embedding and tests
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    sources: Arc<RwLock<Vec<LiveSource>>>,
}

impl MemoryConfigStore {
    pub fn new(sources: Vec<LiveSource>) -> Self {
        Self {
            sources: Arc::new(RwLock::new(sources)),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn live_source(&self, key: &str) -> AppResult<Option<LiveSource>> {
        Ok(self
            .sources
            .read()
            .await
            .iter()
            .find(|source| source.key == key)
            .cloned())
    }

    async fn live_sources(&self) -> AppResult<Vec<LiveSource>> {
        Ok(self.sources.read().await.clone())
    }

    async fn save_channel_number(&self, key: &str, channel_number: usize) -> AppResult<()> {
        let mut sources = self.sources.write().await;
        let source = sources
            .iter_mut()
            .find(|source| source.key == key)
            .ok_or_else(|| AppError::not_found("live_source", key))?;
        source.channel_number = channel_number;
        Ok(())
    }
}
