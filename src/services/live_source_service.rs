//! Live source orchestration
//!
//! Owns the cache and decides when the pipeline runs. A failed run always
//! leaves the key uncached so stale channels are never served as current.
//!
//! Overlapping refreshes of the same key are not serialized: both run and the
//! last one to finish wins the cache slot. Different keys never interact.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::ConfigStore;
use crate::errors::{AppError, AppResult, SourceError};
use crate::ingestor::LiveIngestor;
use crate::models::{LiveChannels, LiveSource};
use crate::services::LiveChannelCache;
use crate::utils::UrlUtils;

pub struct LiveSourceService {
    ingestor: LiveIngestor,
    store: Arc<dyn ConfigStore>,
    cache: LiveChannelCache,
}

impl LiveSourceService {
    pub fn new(ingestor: LiveIngestor, store: Arc<dyn ConfigStore>, cache: LiveChannelCache) -> Self {
        Self {
            ingestor,
            store,
            cache,
        }
    }

    pub fn cache(&self) -> &LiveChannelCache {
        &self.cache
    }

    /// Cached channels for `key`, running the pipeline on a miss
    ///
    /// `None` for unknown or disabled sources and for failed runs.
    pub async fn get(&self, key: &str) -> AppResult<Option<Arc<LiveChannels>>> {
        if let Some(cached) = self.cache.get(key).await {
            debug!("Cache hit for live source '{}'", key);
            return Ok(Some(cached));
        }

        let Some(source) = self.store.live_source(key).await? else {
            debug!("Live source '{}' is not configured", key);
            return Ok(None);
        };
        if source.disabled {
            debug!("Live source '{}' is disabled", key);
            return Ok(None);
        }

        Ok(self.run(&source).await)
    }

    /// Evict then rebuild; returns the channel count, `0` on failure
    pub async fn refresh(&self, source: &LiveSource) -> usize {
        self.cache.invalidate(&source.key).await;
        self.run(source)
            .await
            .map(|channels| channels.channel_number)
            .unwrap_or(0)
    }

    /// Refresh a configured source by key
    pub async fn refresh_key(&self, key: &str) -> AppResult<usize> {
        let source = self
            .store
            .live_source(key)
            .await?
            .ok_or_else(|| AppError::not_found("live_source", key))?;
        Ok(self.refresh(&source).await)
    }

    /// Refresh every enabled source, one after another
    pub async fn refresh_all(&self) -> AppResult<Vec<(String, usize)>> {
        let sources = self.store.live_sources().await?;
        let mut counts = Vec::with_capacity(sources.len());

        for source in sources.iter().filter(|source| !source.disabled) {
            let count = self.refresh(source).await;
            counts.push((source.key.clone(), count));
        }

        let failed = counts.iter().filter(|(_, count)| *count == 0).count();
        info!(
            "Refreshed {} live sources ({} failed, {} disabled skipped)",
            counts.len(),
            failed,
            sources.len() - counts.len()
        );
        Ok(counts)
    }

    /// Evict without refreshing
    pub async fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key).await
    }

    async fn run(&self, source: &LiveSource) -> Option<Arc<LiveChannels>> {
        let channels = match self.ingestor.ingest(source).await {
            Ok(channels) => channels,
            Err(AppError::Source(e @ SourceError::ParseEmpty { .. })) => {
                warn!("Live source '{}': {}", source.key, e);
                return None;
            }
            Err(e) => {
                error!(
                    "Live source '{}' ({}) failed: {}",
                    source.key,
                    UrlUtils::obfuscate_credentials(&source.url),
                    e
                );
                return None;
            }
        };

        let channel_number = channels.channel_number;
        let channels = self.cache.insert(source.key.clone(), channels).await;

        if let Err(e) = self
            .store
            .save_channel_number(&source.key, channel_number)
            .await
        {
            warn!(
                "Live source '{}': failed to persist channel number: {}",
                source.key, e
            );
        }

        Some(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestionConfig;
    use crate::config::store::MockConfigStore;
    use crate::utils::{ByteStream, DecompressingHttpClient};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tracing_test::traced_test;

    const PLAYLIST: &str = "#EXTM3U\n#EXTINF:-1,A\nhttp://a/1\n#EXTINF:-1,B\nhttp://a/2\n";

    /// Serves one playlist until told to fail
    #[derive(Default)]
    struct SwitchableClient {
        failing: AtomicBool,
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl DecompressingHttpClient for SwitchableClient {
        async fn fetch_text(&self, url: &str, _user_agent: Option<&str>) -> AppResult<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::fetch_failed(url, "connection refused"));
            }
            Ok(PLAYLIST.to_string())
        }

        async fn fetch_stream(&self, url: &str, _user_agent: Option<&str>) -> AppResult<ByteStream> {
            Err(AppError::fetch_failed(url, "no EPG here"))
        }
    }

    fn source(key: &str) -> LiveSource {
        LiveSource::new(key, key, format!("http://upstream/{key}.m3u"))
    }

    fn service(client: Arc<SwitchableClient>, store: MockConfigStore) -> LiveSourceService {
        LiveSourceService::new(
            LiveIngestor::new(client, IngestionConfig::default()),
            Arc::new(store),
            LiveChannelCache::new(),
        )
    }

    #[tokio::test]
    async fn test_get_runs_pipeline_once_and_persists_count() {
        let mut store = MockConfigStore::new();
        store
            .expect_live_source()
            .withf(|key| key == "cn")
            .times(1)
            .returning(|key| Ok(Some(source(key))));
        store
            .expect_save_channel_number()
            .withf(|key, channel_number| key == "cn" && *channel_number == 2)
            .times(1)
            .returning(|_, _| Ok(()));

        let client = Arc::new(SwitchableClient::default());
        let service = service(client.clone(), store);

        let first = service.get("cn").await.unwrap().unwrap();
        let second = service.get("cn").await.unwrap().unwrap();
        assert_eq!(first.channel_number, 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_unknown_and_disabled_sources() {
        let mut store = MockConfigStore::new();
        store.expect_live_source().returning(|key| {
            Ok((key == "off").then(|| LiveSource {
                disabled: true,
                ..source(key)
            }))
        });
        store.expect_save_channel_number().never();

        let client = Arc::new(SwitchableClient::default());
        let service = service(client.clone(), store);

        assert!(service.get("missing").await.unwrap().is_none());
        assert!(service.get("off").await.unwrap().is_none());
        assert_eq!(client.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_refresh_evicts_previous_entry() {
        let mut store = MockConfigStore::new();
        store
            .expect_save_channel_number()
            .times(1)
            .returning(|_, _| Ok(()));

        let client = Arc::new(SwitchableClient::default());
        let service = service(client.clone(), store);
        let cn = source("cn");

        assert_eq!(service.refresh(&cn).await, 2);
        assert!(service.cache().get("cn").await.is_some());

        client.failing.store(true, Ordering::SeqCst);
        assert_eq!(service.refresh(&cn).await, 0);
        assert!(service.cache().get("cn").await.is_none());
        assert!(logs_contain("connection refused"));
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_result() {
        let mut store = MockConfigStore::new();
        store
            .expect_save_channel_number()
            .returning(|_, _| Err(AppError::internal("disk full")));

        let service = service(Arc::new(SwitchableClient::default()), store);
        assert_eq!(service.refresh(&source("cn")).await, 2);
        assert!(service.cache().get("cn").await.is_some());
    }

    #[tokio::test]
    async fn test_refresh_all_skips_disabled() {
        let mut store = MockConfigStore::new();
        store.expect_live_sources().returning(|| {
            Ok(vec![
                source("a"),
                LiveSource {
                    disabled: true,
                    ..source("b")
                },
                source("c"),
            ])
        });
        store
            .expect_save_channel_number()
            .times(2)
            .returning(|_, _| Ok(()));

        let client = Arc::new(SwitchableClient::default());
        let service = service(client.clone(), store);

        let counts = service.refresh_all().await.unwrap();
        assert_eq!(counts, vec![("a".to_string(), 2), ("c".to_string(), 2)]);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(service.cache().keys().await, vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_key_unknown_is_not_found() {
        let mut store = MockConfigStore::new();
        store.expect_live_source().returning(|_| Ok(None));

        let service = service(Arc::new(SwitchableClient::default()), store);
        assert!(matches!(
            service.refresh_key("nope").await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let mut store = MockConfigStore::new();
        store.expect_save_channel_number().returning(|_, _| Ok(()));

        let service = service(Arc::new(SwitchableClient::default()), store);
        service.refresh(&source("cn")).await;
        assert!(service.invalidate("cn").await);
        assert!(service.cache().is_empty().await);
    }
}
