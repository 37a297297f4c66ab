//! Image search orchestration.
//!
//! [`RecognitionOrchestrator::search`] turns a set of user images into a
//! ranked result list:
//!
//! 1. validate inputs (image MIME type, size ceiling)
//! 2. fingerprint the set and consult the image cache
//! 3. on a miss, run each image through the [`RecognizerChain`] in order
//! 4. merge, filter, rank (see [`merge`](super::merge))
//! 5. cache and return
//!
//! # Superseded searches
//!
//! Every search takes a generation number when it starts. If another search
//! has started by the time results are ready, the older search still returns
//! its results to its caller but does not write them to the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, instrument, warn};

use super::merge::{merge_results, rank};
use crate::cache::SearchCache;
use crate::hashing::fingerprint_loaded;
use crate::recognizer::RecognizerChain;
use crate::telemetry;
use crate::types::{ImageInput, LoadedImage, RecognitionOptions, RecognitionResult};
use crate::{FleamarkError, Result};

/// Default upper bound on a single image's size (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Coordinates validation, caching and recognition for image searches.
pub struct RecognitionOrchestrator {
    chain: RecognizerChain,
    cache: Arc<SearchCache>,
    max_image_bytes: u64,
    generation: AtomicU64,
}

impl RecognitionOrchestrator {
    pub fn new(chain: RecognizerChain, cache: Arc<SearchCache>) -> Self {
        Self {
            chain,
            cache,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_max_image_bytes(mut self, bytes: u64) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    pub fn chain(&self) -> &RecognizerChain {
        &self.chain
    }

    pub fn max_image_bytes(&self) -> u64 {
        self.max_image_bytes
    }

    /// Generation of the most recently started search.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Search for market items shown in `images`.
    ///
    /// Fails with [`FleamarkError::InvalidInput`] when no input is a usable
    /// image, and with [`FleamarkError::Hashing`] when image bytes cannot be
    /// read. Recognizer failures never surface; they only reduce the results.
    #[instrument(skip_all, fields(images = images.len()))]
    pub async fn search(
        &self,
        images: &[ImageInput],
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>> {
        let accepted = self.validate(images).await?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut loaded = Vec::with_capacity(accepted.len());
        for image in accepted {
            loaded.push(image.read().await?);
        }
        let fingerprint = fingerprint_loaded(&loaded);

        if let Some(cached) = self.cache.get_image(&fingerprint).await {
            metrics::counter!(telemetry::SEARCHES_TOTAL, "outcome" => "hit").increment(1);
            debug!(fingerprint = %fingerprint, results = cached.len(), "image search cache hit");
            return Ok(cached);
        }
        metrics::counter!(telemetry::SEARCHES_TOTAL, "outcome" => "miss").increment(1);

        let results = rank(self.recognize_all(&loaded, options).await, options);

        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.set_image(&fingerprint, results.clone(), None).await;
        } else {
            metrics::counter!(telemetry::STALE_WRITES_DISCARDED_TOTAL).increment(1);
            debug!(generation, "newer search started, skipping cache write");
        }

        info!(results = results.len(), "image search complete");
        Ok(results)
    }

    async fn recognize_all(
        &self,
        images: &[LoadedImage],
        options: &RecognitionOptions,
    ) -> Vec<RecognitionResult> {
        let mut batches = Vec::with_capacity(images.len());
        for image in images {
            batches.push(self.chain.recognize(image, options).await);
        }
        merge_results(batches)
    }

    async fn validate<'a>(&self, images: &'a [ImageInput]) -> Result<Vec<&'a ImageInput>> {
        if images.is_empty() {
            return Err(FleamarkError::InvalidInput("no images provided".to_string()));
        }
        let mut accepted = Vec::with_capacity(images.len());
        for image in images {
            if !image.is_image() {
                warn!(image = %image.name, mime_type = %image.mime_type, "skipping non-image input");
                continue;
            }
            if let Some(size) = image.size_hint().await
                && size > self.max_image_bytes
            {
                warn!(image = %image.name, size, limit = self.max_image_bytes, "skipping oversized image");
                continue;
            }
            accepted.push(image);
        }
        if accepted.is_empty() {
            return Err(FleamarkError::InvalidInput(
                "no valid images: expected image/* files within the size limit".to_string(),
            ));
        }
        Ok(accepted)
    }
}
