//! Builder for configuring search service instances

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::MarketSearch;
use crate::cache::{BlobStore, CacheConfig, FileBlobStore, SearchCache, SearchCacheConfig};
use crate::catalog::ItemCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::recognizer::{
    CatalogRecognizer, DEFAULT_RECOGNITION_TIMEOUT, RecognitionStrategy, Recognizer,
    RecognizerChain, RetryConfig, RetryingRecognizer,
};
use crate::search::{DEFAULT_MAX_IMAGE_BYTES, RecognitionOrchestrator};
use crate::{FleamarkError, Result};

/// Main entry point for creating search service instances.
pub struct Fleamark;

impl Fleamark {
    /// Create a new builder for configuring the search service.
    pub fn builder() -> FleamarkBuilder {
        FleamarkBuilder::new()
    }
}

#[cfg(feature = "http-recognizer")]
#[derive(Debug, Clone)]
struct HttpRecognizerSettings {
    base_url: String,
    api_key: Option<String>,
}

/// Builder for configuring search service instances.
pub struct FleamarkBuilder {
    clock: Arc<dyn Clock>,
    cache_config: SearchCacheConfig,
    blob_store: Option<Arc<dyn BlobStore>>,
    storage_dir: Option<PathBuf>,
    max_blob_bytes: Option<usize>,
    primary: Option<Arc<dyn Recognizer>>,
    #[cfg(feature = "http-recognizer")]
    http: Option<HttpRecognizerSettings>,
    catalog: Option<Arc<dyn ItemCatalog>>,
    strategy: RecognitionStrategy,
    timeout: Duration,
    retry: Option<RetryConfig>,
    max_image_bytes: u64,
}

impl FleamarkBuilder {
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            cache_config: SearchCacheConfig::default(),
            blob_store: None,
            storage_dir: None,
            max_blob_bytes: None,
            primary: None,
            #[cfg(feature = "http-recognizer")]
            http: None,
            catalog: None,
            strategy: RecognitionStrategy::default(),
            timeout: DEFAULT_RECOGNITION_TIMEOUT,
            retry: None,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Apply a loaded [`Config`].
    ///
    /// Settings made before this call are overwritten where the config
    /// covers them; later calls override the config.
    pub fn from_config(mut self, config: &Config) -> Self {
        self.cache_config = config.search_cache_config();
        if config.storage.enabled {
            self.storage_dir = Some(
                config
                    .storage
                    .dir
                    .clone()
                    .unwrap_or_else(FileBlobStore::default_dir),
            );
            self.max_blob_bytes = config.storage.max_blob_bytes;
        } else {
            self.storage_dir = None;
        }
        self.strategy = config.recognition.strategy;
        self.timeout = config.recognition_timeout();
        self.max_image_bytes = config.recognition.max_image_bytes;
        self.retry = Some(config.retry_config());

        #[cfg(feature = "http-recognizer")]
        if let Some(recognizer) = &config.recognizer {
            self.http = Some(HttpRecognizerSettings {
                base_url: recognizer.base_url.clone(),
                api_key: recognizer.api_key(),
            });
        }
        #[cfg(not(feature = "http-recognizer"))]
        if config.recognizer.is_some() {
            tracing::warn!("[recognizer] configured but the http-recognizer feature is disabled");
        }
        self
    }

    /// Set the clock used for cache timestamps (default: system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the sizing of both caches and the sweep period.
    pub fn cache_config(mut self, config: SearchCacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    pub fn text_cache(mut self, config: CacheConfig) -> Self {
        self.cache_config.text = config;
        self
    }

    pub fn image_cache(mut self, config: CacheConfig) -> Self {
        self.cache_config.image = config;
        self
    }

    /// Period of the background expiry sweep; `None` disables it.
    pub fn sweep_interval(mut self, every: Option<Duration>) -> Self {
        self.cache_config.sweep_interval = every;
        self
    }

    /// Persist caches through `store`. Takes precedence over [`storage_dir`](Self::storage_dir).
    pub fn blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    /// Persist caches as JSON files under `dir`.
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Reject snapshot blobs larger than `bytes` (file storage only).
    pub fn max_blob_bytes(mut self, bytes: usize) -> Self {
        self.max_blob_bytes = Some(bytes);
        self
    }

    /// Use a custom primary recognizer.
    pub fn primary_recognizer(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.primary = Some(recognizer);
        self
    }

    /// Use a remote recognition service as the primary recognizer.
    ///
    /// Ignored when a custom primary recognizer is also set.
    #[cfg(feature = "http-recognizer")]
    pub fn http_recognizer(mut self, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        self.http = Some(HttpRecognizerSettings {
            base_url: base_url.into(),
            api_key,
        });
        self
    }

    /// Enable the name-based fallback over `catalog`.
    pub fn catalog(mut self, catalog: Arc<dyn ItemCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn strategy(mut self, strategy: RecognitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Deadline for a single recognizer call (default: 15s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retry transient primary recognizer failures.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Largest accepted image in bytes (default: 10 MiB).
    pub fn max_image_bytes(mut self, bytes: u64) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    fn primary(&self) -> Result<Option<Arc<dyn Recognizer>>> {
        if let Some(primary) = &self.primary {
            return Ok(Some(primary.clone()));
        }
        #[cfg(feature = "http-recognizer")]
        if let Some(settings) = &self.http {
            let mut recognizer = crate::recognizer::HttpRecognizer::new(settings.base_url.clone())?;
            if let Some(key) = &settings.api_key {
                recognizer = recognizer.with_api_key(key.clone());
            }
            return Ok(Some(Arc::new(recognizer)));
        }
        Ok(None)
    }

    fn blob_store_or_dir(&self) -> Option<Arc<dyn BlobStore>> {
        if let Some(store) = &self.blob_store {
            return Some(store.clone());
        }
        self.storage_dir.as_ref().map(|dir| {
            let mut store = FileBlobStore::new(dir.clone());
            if let Some(limit) = self.max_blob_bytes {
                store = store.with_quota(limit);
            }
            Arc::new(store) as Arc<dyn BlobStore>
        })
    }

    /// Build the search service, restoring persisted caches.
    ///
    /// Fails with [`FleamarkError::NoRecognizer`] when the strategy cannot
    /// reach any configured recognizer. Must be called inside a tokio
    /// runtime when a sweep interval is set.
    pub async fn build(self) -> Result<MarketSearch> {
        let mut chain = RecognizerChain::new()
            .with_strategy(self.strategy)
            .with_timeout(self.timeout);

        if let Some(primary) = self.primary()? {
            let primary = match &self.retry {
                Some(config) if config.max_attempts > 1 => {
                    Arc::new(RetryingRecognizer::new(primary, config.clone())) as Arc<dyn Recognizer>
                }
                _ => primary,
            };
            chain = chain.with_primary(primary);
        }
        if let Some(catalog) = &self.catalog {
            chain = chain.with_fallback(Arc::new(CatalogRecognizer::new(catalog.clone())));
        }
        if !chain.is_usable() {
            return Err(FleamarkError::NoRecognizer);
        }

        let cache = match self.blob_store_or_dir() {
            Some(store) => {
                debug!(store = store.name(), "restoring persisted caches");
                SearchCache::with_persistence(&self.cache_config, self.clock.clone(), store).await
            }
            None => SearchCache::new(&self.cache_config, self.clock.clone()),
        };
        let cache = Arc::new(cache);

        let sweeper = self
            .cache_config
            .sweep_interval
            .map(|every| cache.spawn_sweeper(every));

        let orchestrator = RecognitionOrchestrator::new(chain, cache.clone())
            .with_max_image_bytes(self.max_image_bytes);

        info!(
            strategy = ?self.strategy,
            persistent = cache.is_persistent(),
            "search service ready"
        );
        Ok(MarketSearch::new(cache, orchestrator, sweeper))
    }
}

impl Default for FleamarkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
