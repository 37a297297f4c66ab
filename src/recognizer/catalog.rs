//! Name-based fallback recognizer.
//!
//! When the primary recognizer cannot identify an image, the file name is
//! often still a usable hint ("salewa_first_aid.png"). [`CatalogRecognizer`]
//! searches an [`ItemCatalog`] for that hint and reports matches with a
//! reduced confidence, since a name is weaker evidence than the pixels.
//!
//! Catalog lookups are memoized per normalized hint in a bounded moka cache.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use super::traits::Recognizer;
use crate::Result;
use crate::catalog::{ItemCatalog, match_score};
use crate::types::{Item, ItemRef, LoadedImage, RecognitionOptions, RecognitionResult};

/// Confidence assigned to a perfect name match.
pub const NAME_MATCH_CONFIDENCE: f64 = 0.6;

/// Default number of memoized catalog lookups.
pub const DEFAULT_LOOKUP_CACHE_ENTRIES: u64 = 500;

/// Default lifetime of a memoized catalog lookup.
pub const DEFAULT_LOOKUP_CACHE_TTL: Duration = Duration::from_secs(600);

/// Items requested from the catalog per lookup.
const LOOKUP_LIMIT: usize = 25;

/// Recognizes images by searching the catalog for their file name.
pub struct CatalogRecognizer {
    catalog: Arc<dyn ItemCatalog>,
    lookups: Cache<String, Arc<Vec<Item>>>,
}

impl CatalogRecognizer {
    pub fn new(catalog: Arc<dyn ItemCatalog>) -> Self {
        Self::with_lookup_cache(catalog, DEFAULT_LOOKUP_CACHE_ENTRIES, DEFAULT_LOOKUP_CACHE_TTL)
    }

    pub fn with_lookup_cache(catalog: Arc<dyn ItemCatalog>, max_entries: u64, ttl: Duration) -> Self {
        let lookups = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { catalog, lookups }
    }

    /// Search the catalog for `hint` and score the matches.
    ///
    /// A blank hint yields no results. Without `include_variants` only the
    /// best match is returned; otherwise at most `max_results`.
    pub async fn recognize_by_name(
        &self,
        hint: &str,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>> {
        let hint = normalize_hint(hint);
        if hint.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let items = self.lookup(&hint).await?;

        let mut results: Vec<RecognitionResult> = items
            .iter()
            .map(|item| (match_score(&hint, item), item))
            .filter(|(score, _)| *score > 0.0)
            .map(|(score, item)| {
                RecognitionResult::new(ItemRef::from(item), NAME_MATCH_CONFIDENCE * score)
            })
            .collect();
        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let limit = if options.include_variants {
            options.max_results
        } else {
            1
        };
        results.truncate(limit);

        let elapsed = start.elapsed().as_millis() as u64;
        for result in &mut results {
            result.processing_time_ms = Some(elapsed);
        }
        debug!(hint = %hint, matches = results.len(), "catalog name lookup");
        Ok(results)
    }

    async fn lookup(&self, hint: &str) -> Result<Arc<Vec<Item>>> {
        if let Some(items) = self.lookups.get(hint).await {
            return Ok(items);
        }
        let items = Arc::new(self.catalog.search_items(hint, LOOKUP_LIMIT).await?);
        self.lookups.insert(hint.to_string(), items.clone()).await;
        Ok(items)
    }
}

#[async_trait]
impl Recognizer for CatalogRecognizer {
    fn name(&self) -> &str {
        "catalog"
    }

    async fn recognize(
        &self,
        image: &LoadedImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>> {
        self.recognize_by_name(&hint_from_file_name(&image.name), options)
            .await
    }
}

/// Search hint derived from an image file name.
///
/// Drops the extension, turns `_` and `.` into spaces and lower-cases.
pub fn hint_from_file_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_hint(&stem.replace(['_', '.'], " "))
}

fn normalize_hint(hint: &str) -> String {
    hint.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_strips_extension_and_separators() {
        assert_eq!(hint_from_file_name("Salewa_First.Aid.png"), "salewa first aid");
        assert_eq!(hint_from_file_name("  GPU  .jpg"), "gpu");
        assert_eq!(hint_from_file_name(".png"), "png");
        assert_eq!(hint_from_file_name(""), "");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_hint("  Red   Rebel "), "red rebel");
    }
}
