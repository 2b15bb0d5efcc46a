//! In-process cache of pipeline results
//!
//! Entries are replaced wholesale and never mutated. There is no expiry;
//! callers evict explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::models::LiveChannels;

/// Last successful [`LiveChannels`] per source key
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct LiveChannelCache {
    entries: Arc<RwLock<HashMap<String, Arc<LiveChannels>>>>,
}

impl LiveChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Arc<LiveChannels>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store a result, replacing whatever was cached for `key`
    pub async fn insert(&self, key: impl Into<String>, channels: LiveChannels) -> Arc<LiveChannels> {
        let channels = Arc::new(channels);
        self.entries
            .write()
            .await
            .insert(key.into(), Arc::clone(&channels));
        channels
    }

    /// Evict `key`; returns whether an entry was present
    pub async fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.write().await.remove(key).is_some();
        if removed {
            debug!("Evicted cached live channels for '{}'", key);
        }
        removed
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}
