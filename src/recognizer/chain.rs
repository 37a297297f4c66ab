//! Primary/fallback recognizer selection.
//!
//! The chain runs one image through the recognizers named by its
//! [`RecognitionStrategy`]. Every call carries a deadline; a timeout is
//! handled like any other failure. The chain itself never fails: an image
//! that no recognizer could handle simply yields no results.
//!
//! ```text
//!   image ──► primary ──ok, non-empty──► results
//!                │
//!                └─ error / timeout / empty ──► fallback ──► results (maybe empty)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::traits::Recognizer;
use crate::telemetry;
use crate::types::{LoadedImage, RecognitionOptions, RecognitionResult};
use crate::{FleamarkError, Result};

/// Default deadline for a single recognizer call.
pub const DEFAULT_RECOGNITION_TIMEOUT: Duration = Duration::from_secs(15);

/// Which recognizers the chain consults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionStrategy {
    /// Primary first; fallback when the primary fails or finds nothing.
    #[default]
    PrimaryWithFallback,
    PrimaryOnly,
    FallbackOnly,
}

/// Optional primary and fallback recognizers plus the strategy between them.
#[derive(Clone)]
pub struct RecognizerChain {
    primary: Option<Arc<dyn Recognizer>>,
    fallback: Option<Arc<dyn Recognizer>>,
    strategy: RecognitionStrategy,
    timeout: Duration,
}

impl Default for RecognizerChain {
    fn default() -> Self {
        Self {
            primary: None,
            fallback: None,
            strategy: RecognitionStrategy::default(),
            timeout: DEFAULT_RECOGNITION_TIMEOUT,
        }
    }
}

impl RecognizerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.primary = Some(recognizer);
        self
    }

    pub fn with_fallback(mut self, recognizer: Arc<dyn Recognizer>) -> Self {
        self.fallback = Some(recognizer);
        self
    }

    pub fn with_strategy(mut self, strategy: RecognitionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn strategy(&self) -> RecognitionStrategy {
        self.strategy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the strategy can reach at least one configured recognizer.
    pub fn is_usable(&self) -> bool {
        match self.strategy {
            RecognitionStrategy::PrimaryWithFallback => {
                self.primary.is_some() || self.fallback.is_some()
            }
            RecognitionStrategy::PrimaryOnly => self.primary.is_some(),
            RecognitionStrategy::FallbackOnly => self.fallback.is_some(),
        }
    }

    /// Recognize one image. Failures degrade to an empty list.
    #[instrument(skip_all, fields(image = %image.name, strategy = ?self.strategy))]
    pub async fn recognize(
        &self,
        image: &LoadedImage,
        options: &RecognitionOptions,
    ) -> Vec<RecognitionResult> {
        match self.strategy {
            RecognitionStrategy::PrimaryOnly => self.run(self.primary.as_ref(), image, options).await,
            RecognitionStrategy::FallbackOnly => {
                self.run(self.fallback.as_ref(), image, options).await
            }
            RecognitionStrategy::PrimaryWithFallback => {
                let results = self.run(self.primary.as_ref(), image, options).await;
                if !results.is_empty() || self.fallback.is_none() {
                    return results;
                }
                metrics::counter!(telemetry::RECOGNITION_FALLBACKS_TOTAL).increment(1);
                debug!("consulting fallback recognizer");
                self.run(self.fallback.as_ref(), image, options).await
            }
        }
    }

    async fn run(
        &self,
        recognizer: Option<&Arc<dyn Recognizer>>,
        image: &LoadedImage,
        options: &RecognitionOptions,
    ) -> Vec<RecognitionResult> {
        let Some(recognizer) = recognizer else {
            return Vec::new();
        };
        let start = Instant::now();
        let outcome = self.call(recognizer.as_ref(), image, options).await;
        let status = match &outcome {
            Ok(results) if results.is_empty() => "empty",
            Ok(_) => "ok",
            Err(FleamarkError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        record_recognition(recognizer.name(), status, start);

        match outcome {
            Ok(results) => results,
            Err(e) => {
                warn!(recognizer = recognizer.name(), error = %e, "recognition failed");
                Vec::new()
            }
        }
    }

    async fn call(
        &self,
        recognizer: &dyn Recognizer,
        image: &LoadedImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>> {
        tokio::time::timeout(self.timeout, recognizer.recognize(image, options))
            .await
            .map_err(|_| FleamarkError::Timeout(self.timeout))?
    }
}

fn record_recognition(recognizer: &str, status: &'static str, start: Instant) {
    metrics::counter!(telemetry::RECOGNITIONS_TOTAL,
        "recognizer" => recognizer.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::RECOGNITION_DURATION_SECONDS,
        "recognizer" => recognizer.to_owned(),
    )
    .record(start.elapsed().as_secs_f64());
}
