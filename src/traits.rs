//! Core SearchGateway trait

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::CacheStats;
use crate::types::{ImageFingerprint, ImageInput, Item, RecognitionOptions, RecognitionResult};
use crate::Result;

/// The search surface consumed by pages and UI hooks.
///
/// Cache misses are `None`; a cached empty list would be `Some(vec![])`,
/// although empty result lists are never stored.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Cached items for a text query (case- and whitespace-insensitive).
    async fn get_cached_text_search(&self, query: &str) -> Option<Vec<Item>>;

    /// Cache items for a text query. `ttl` overrides the store default.
    async fn set_cached_text_search(&self, query: &str, results: Vec<Item>, ttl: Option<Duration>);

    /// Cached recognition results for an image set.
    async fn get_cached_image_search(
        &self,
        fingerprint: &ImageFingerprint,
    ) -> Option<Vec<RecognitionResult>>;

    /// Cache recognition results for an image set.
    async fn set_cached_image_search(
        &self,
        fingerprint: &ImageFingerprint,
        results: Vec<RecognitionResult>,
        ttl: Option<Duration>,
    );

    /// Empty both caches and their persisted snapshots.
    async fn clear_cache(&self);

    /// Entry counts, approximate size and combined hit rate.
    fn cache_stats(&self) -> CacheStats;

    /// Identify market items in a set of images.
    async fn search_by_images(
        &self,
        images: &[ImageInput],
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>>;
}
