//! Caching subsystem.
//!
//! [`SearchCache`] owns the two search caches and keeps them in step with
//! durable storage:
//!
//! - text search: normalised query → [`Item`] list
//! - image search: [`ImageFingerprint`] → [`RecognitionResult`] list
//!
//! Each cache is a [`CacheStore`] (TTL + LRU, see [`store`]). When a
//! [`BlobStore`] is attached, every structural change (insert, overwrite,
//! expiry removal, eviction, clear) is followed by a snapshot save through
//! [`CachePersistence`]; save failures are logged and never reach the
//! caller. A background sweep can be started with
//! [`SearchCache::spawn_sweeper`] to drop expired entries proactively.

pub mod persistence;
pub mod stats;
pub mod store;

pub use persistence::{
    BlobStore, CachePersistence, FileBlobStore, LoadedSnapshot, MemoryBlobStore,
};
pub use stats::{HitStats, StatsTracker};
pub use store::{CacheConfig, CacheEntry, CacheStore, CacheValue, StoreStats};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::types::{ImageFingerprint, Item, RecognitionResult, TextSearchKey};

/// Blob key for the text-search snapshot.
pub const TEXT_SNAPSHOT_KEY: &str = "fleamark.text-search-cache";

/// Blob key for the image-search snapshot.
pub const IMAGE_SNAPSHOT_KEY: &str = "fleamark.image-search-cache";

/// Default period of the expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for both search caches.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCacheConfig {
    pub text: CacheConfig,
    pub image: CacheConfig,
    /// Period of the background expiry sweep; `None` disables it.
    pub sweep_interval: Option<Duration>,
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            text: CacheConfig::default(),
            image: CacheConfig::default(),
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

/// Aggregate statistics over both caches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub text_entries: usize,
    pub image_entries: usize,
    /// Approximate serialized size of all entries.
    pub total_size_bytes: usize,
    /// Combined hit rate of both caches.
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
}

/// Text and image search caches with optional persistence.
pub struct SearchCache {
    text: CacheStore<Vec<Item>>,
    image: CacheStore<Vec<RecognitionResult>>,
    text_persistence: Option<CachePersistence>,
    image_persistence: Option<CachePersistence>,
    clock: Arc<dyn Clock>,
}

impl SearchCache {
    /// Create in-memory caches with nothing persisted.
    pub fn new(config: &SearchCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            text: CacheStore::new("text", config.text.clone(), clock.clone()),
            image: CacheStore::new("image", config.image.clone(), clock.clone()),
            text_persistence: None,
            image_persistence: None,
            clock,
        }
    }

    /// Create caches backed by `store`, restoring any saved snapshots.
    pub async fn with_persistence(
        config: &SearchCacheConfig,
        clock: Arc<dyn Clock>,
        store: Arc<dyn BlobStore>,
    ) -> Self {
        let mut cache = Self::new(config, clock);
        let text = CachePersistence::new(store.clone(), TEXT_SNAPSHOT_KEY, "text");
        let image = CachePersistence::new(store, IMAGE_SNAPSHOT_KEY, "image");

        let now = cache.clock.now_millis();
        let text_snapshot = text.load(now).await;
        let image_snapshot = image.load(now).await;
        let text_pruned = text_snapshot.pruned > 0;
        let image_pruned = image_snapshot.pruned > 0;
        cache.text.restore(text_snapshot.entries);
        cache.image.restore(image_snapshot.entries);
        cache.text_persistence = Some(text);
        cache.image_persistence = Some(image);

        // Anything dropped while loading leaves the stored snapshot stale.
        if cache.text.take_dirty() || text_pruned {
            save(&cache.text, cache.text_persistence.as_ref(), now).await;
        }
        if cache.image.take_dirty() || image_pruned {
            save(&cache.image, cache.image_persistence.as_ref(), now).await;
        }
        cache
    }

    // ========================================================================
    // Text search
    // ========================================================================

    /// Cached results for a query, matched case- and whitespace-insensitively.
    pub async fn get_text(&self, query: &str) -> Option<Vec<Item>> {
        let key = TextSearchKey::new(query)?;
        let results = self.text.get(key.as_str());
        self.persist_text().await;
        results
    }

    /// Cache results for a query. Blank queries and empty results are ignored.
    pub async fn set_text(&self, query: &str, results: Vec<Item>, ttl: Option<Duration>) {
        let Some(key) = TextSearchKey::new(query) else {
            return;
        };
        self.text.set(key.as_str(), results, ttl);
        self.persist_text().await;
    }

    // ========================================================================
    // Image search
    // ========================================================================

    pub async fn get_image(&self, fingerprint: &ImageFingerprint) -> Option<Vec<RecognitionResult>> {
        let results = self.image.get(fingerprint.as_str());
        self.persist_image().await;
        results
    }

    /// Cache recognition results. Empty results are ignored.
    pub async fn set_image(
        &self,
        fingerprint: &ImageFingerprint,
        results: Vec<RecognitionResult>,
        ttl: Option<Duration>,
    ) {
        self.image.set(fingerprint.as_str(), results, ttl);
        self.persist_image().await;
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Empty both caches, reset their counters and persist the empty state.
    pub async fn clear(&self) {
        self.text.clear();
        self.image.clear();
        self.text.reset_stats();
        self.image.reset_stats();
        self.persist_text().await;
        self.persist_image().await;
    }

    /// Drop every expired entry from both caches.
    pub async fn purge_expired(&self) -> usize {
        let purged = self.text.purge_expired() + self.image.purge_expired();
        self.persist_text().await;
        self.persist_image().await;
        purged
    }

    /// Write both snapshots regardless of pending changes.
    pub async fn flush(&self) {
        self.text.take_dirty();
        self.image.take_dirty();
        save(&self.text, self.text_persistence.as_ref(), self.clock.now_millis()).await;
        save(&self.image, self.image_persistence.as_ref(), self.clock.now_millis()).await;
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.text.hit_stats().merge(self.image.hit_stats());
        CacheStats {
            text_entries: self.text.len(),
            image_entries: self.image.len(),
            total_size_bytes: self.text.size_bytes() + self.image.size_bytes(),
            hit_rate: hits.hit_rate,
            hits: hits.hits,
            misses: hits.misses,
        }
    }

    pub fn text_store(&self) -> &CacheStore<Vec<Item>> {
        &self.text
    }

    pub fn image_store(&self) -> &CacheStore<Vec<RecognitionResult>> {
        &self.image
    }

    pub fn is_persistent(&self) -> bool {
        self.text_persistence.is_some()
    }

    /// Start a task that purges expired entries every `every`.
    ///
    /// The task holds only a weak reference and ends once the cache is
    /// dropped; abort the handle to stop it earlier.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "swept expired cache entries");
                }
            }
        })
    }

    async fn persist_text(&self) {
        if self.text.take_dirty() {
            save(&self.text, self.text_persistence.as_ref(), self.clock.now_millis()).await;
        }
    }

    async fn persist_image(&self) {
        if self.image.take_dirty() {
            save(&self.image, self.image_persistence.as_ref(), self.clock.now_millis()).await;
        }
    }
}

async fn save<V: CacheValue>(
    store: &CacheStore<V>,
    persistence: Option<&CachePersistence>,
    now: u64,
) {
    let Some(persistence) = persistence else {
        return;
    };
    if let Err(e) = persistence.persist(store, now).await {
        warn!(cache = store.name(), error = %e, "failed to persist cache snapshot");
    }
}
