//! MarketSearch - the composed search service

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{CacheStats, SearchCache};
use crate::search::RecognitionOrchestrator;
use crate::types::{ImageFingerprint, ImageInput, Item, RecognitionOptions, RecognitionResult};
use crate::{Result, SearchGateway, hashing};

/// Search service owning both caches and the recognition pipeline.
///
/// Created by [`Fleamark::builder`](crate::Fleamark::builder). Dropping the
/// service stops its background sweep; call [`MarketSearch::shutdown`] to
/// also write a final snapshot.
pub struct MarketSearch {
    cache: Arc<SearchCache>,
    orchestrator: RecognitionOrchestrator,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MarketSearch {
    pub(crate) fn new(
        cache: Arc<SearchCache>,
        orchestrator: RecognitionOrchestrator,
        sweeper: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            cache,
            orchestrator,
            sweeper: Mutex::new(sweeper),
        }
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    pub fn orchestrator(&self) -> &RecognitionOrchestrator {
        &self.orchestrator
    }

    /// Cache key for a set of images, for use with the image cache accessors.
    pub async fn fingerprint(&self, images: &[ImageInput]) -> Result<ImageFingerprint> {
        hashing::fingerprint(images).await
    }

    /// Drop expired entries now rather than waiting for the sweep.
    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }

    /// Write both snapshots.
    pub async fn flush(&self) {
        self.cache.flush().await;
    }

    /// Stop the background sweep and write a final snapshot.
    pub async fn shutdown(&self) {
        self.stop_sweeper();
        self.cache.flush().await;
        debug!("search service shut down");
    }

    fn stop_sweeper(&self) {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for MarketSearch {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

#[async_trait]
impl SearchGateway for MarketSearch {
    async fn get_cached_text_search(&self, query: &str) -> Option<Vec<Item>> {
        self.cache.get_text(query).await
    }

    async fn set_cached_text_search(&self, query: &str, results: Vec<Item>, ttl: Option<Duration>) {
        self.cache.set_text(query, results, ttl).await;
    }

    async fn get_cached_image_search(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Option<Vec<RecognitionResult>> {
        self.cache.get_image(fingerprint).await
    }

    async fn set_cached_image_search(
        &self,
        fingerprint: &ImageFingerprint,
        results: Vec<RecognitionResult>,
        ttl: Option<Duration>,
    ) {
        self.cache.set_image(fingerprint, results, ttl).await;
    }

    async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn search_by_images(
        &self,
        images: &[ImageInput],
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>> {
        self.orchestrator.search(images, options).await
    }
}
