//! The recognizer capability.
//!
//! Both the primary (model-backed) recognizer and the catalog fallback
//! implement [`Recognizer`], so the chain selects between them by strategy
//! rather than by inspecting what an object happens to support.
//!
//! # Failure semantics
//!
//! A recognizer may fail for any reason. An `Ok(vec![])` means "looked, found
//! nothing". The chain treats both the same way: it moves on to the fallback
//! and, if that also comes up empty, the image contributes no results.

use async_trait::async_trait;

use crate::Result;
use crate::types::{LoadedImage, RecognitionOptions, RecognitionResult};

/// Identifies market items in an image.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognizer name for logging/metrics.
    fn name(&self) -> &str;

    /// Candidate matches for one image, in no particular order.
    async fn recognize(
        &self,
        image: &LoadedImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>>;
}
