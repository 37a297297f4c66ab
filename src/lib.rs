//! Fleamark - search caching and image recognition for game market data
//!
//! This crate provides a stable `SearchGateway` trait over two concerns of
//! a market-search front end:
//!
//! - bounded TTL + LRU caches for text and image searches, optionally
//!   persisted across restarts
//! - image recognition orchestration: validation, content fingerprinting,
//!   primary/fallback recognizers, result merging and ranking
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fleamark::{Fleamark, ImageInput, RecognitionOptions, SearchGateway, SnapshotCatalog};
//!
//! #[tokio::main]
//! async fn main() -> fleamark::Result<()> {
//!     let catalog = SnapshotCatalog::from_json(r#"[{"id":"1","name":"Salewa first aid kit"}]"#)?;
//!     let search = Fleamark::builder()
//!         .http_recognizer("http://localhost:8080", None)
//!         .catalog(Arc::new(catalog))
//!         .storage_dir("/tmp/fleamark")
//!         .build()
//!         .await?;
//!
//!     let images = [ImageInput::from_path("salewa.png")];
//!     let results = search
//!         .search_by_images(&images, &RecognitionOptions::default())
//!         .await?;
//!
//!     for result in results {
//!         println!("{} ({:.2})", result.item.name, result.confidence);
//!     }
//!     search.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hashing;
pub mod recognizer;
pub mod search;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use error::{FleamarkError, Result};
pub use gateway::{Fleamark, FleamarkBuilder, MarketSearch};
pub use traits::SearchGateway;

pub use cache::{
    BlobStore, CacheConfig, CacheEntry, CacheStats, CacheStore, FileBlobStore, HitStats,
    MemoryBlobStore, SearchCache, SearchCacheConfig, StatsTracker,
};
pub use catalog::{ItemCatalog, SnapshotCatalog, parse_catalog_items};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
#[cfg(feature = "http-recognizer")]
pub use recognizer::HttpRecognizer;
pub use recognizer::{
    CatalogRecognizer, RecognitionStrategy, Recognizer, RecognizerChain, RetryConfig,
    RetryingRecognizer,
};
pub use search::RecognitionOrchestrator;

// Re-export all types
pub use types::{
    ImageFingerprint, ImageInput, ImageSource, Item, ItemRef, LoadedImage, RecognitionMetadata,
    RecognitionOptions, RecognitionResult, Rect, TextSearchKey,
};
