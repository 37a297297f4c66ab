//! HTTP client for a remote image recognition service.
//!
//! The service takes the raw image as the request body:
//!
//! ```text
//! POST {base_url}/v1/recognize?max_results=10&min_confidence=0.5&...
//! Content-Type: image/png
//! X-Image-Name: shot.png
//! Authorization: Bearer <key>        (optional)
//! ```
//!
//! and answers with a payload tagged by `status`:
//!
//! ```json
//! { "status": "ok", "processingTimeMs": 84,
//!   "matches": [{ "item": { "id": "...", "name": "...", "shortName": "..." },
//!                 "confidence": 0.93, "boundingBox": { ... }, "metadata": { ... } }] }
//! { "status": "no_match" }
//! { "status": "error", "message": "model unavailable" }
//! ```
//!
//! Matches are validated here; anything with an empty item id or a
//! confidence outside `[0, 1]` is dropped before it can reach a cache.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::traits::Recognizer;
use crate::types::{
    ItemRef, LoadedImage, Rect, RecognitionMetadata, RecognitionOptions, RecognitionResult,
};
use crate::{FleamarkError, Result};

/// Transport-level timeout; the chain's per-call deadline is usually shorter.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for a remote recognition service.
#[derive(Clone)]
pub struct HttpRecognizer {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRecognizer {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| FleamarkError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Send `Authorization: Bearer <key>` with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn handle_response_errors(response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status.as_u16() {
            401 => Err(FleamarkError::AuthenticationFailed),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(FleamarkError::RateLimited { retry_after })
            }
            code => Err(FleamarkError::Api {
                status: code,
                message: format!("recognition service error: {status}"),
            }),
        }
    }
}

#[async_trait]
impl Recognizer for HttpRecognizer {
    fn name(&self) -> &str {
        "http"
    }

    async fn recognize(
        &self,
        image: &LoadedImage,
        options: &RecognitionOptions,
    ) -> Result<Vec<RecognitionResult>> {
        let url = format!("{}/v1/recognize", self.base_url);
        let query = [
            ("max_results", options.max_results.to_string()),
            ("min_confidence", options.min_confidence.to_string()),
            ("include_variants", options.include_variants.to_string()),
            (
                "detect_multiple_items",
                options.detect_multiple_items.to_string(),
            ),
        ];

        let mut request = self
            .http
            .post(&url)
            .query(&query)
            .header("Content-Type", image.mime_type.as_str())
            .header("X-Image-Name", image.name.as_str())
            .body(image.bytes.clone());
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| FleamarkError::Http(e.to_string()))?;
        Self::handle_response_errors(&response)?;

        let payload: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| FleamarkError::Http(e.to_string()))?;

        match payload {
            RecognizeResponse::Ok {
                matches,
                processing_time_ms,
            } => {
                let total = matches.len();
                let results: Vec<RecognitionResult> = matches
                    .into_iter()
                    .filter_map(|m| m.into_result(processing_time_ms))
                    .collect();
                if results.len() < total {
                    debug!(
                        dropped = total - results.len(),
                        "dropped invalid recognition matches"
                    );
                }
                Ok(results)
            }
            RecognizeResponse::NoMatch => Ok(Vec::new()),
            RecognizeResponse::Error { message } => Err(FleamarkError::Recognition {
                recognizer: self.name().to_string(),
                message: message.unwrap_or_else(|| "unspecified error".to_string()),
            }),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RecognizeResponse {
    #[serde(rename_all = "camelCase")]
    Ok {
        #[serde(default)]
        matches: Vec<RawMatch>,
        #[serde(default)]
        processing_time_ms: Option<u64>,
    },
    NoMatch,
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatch {
    item: RawItemRef,
    confidence: f64,
    #[serde(default)]
    bounding_box: Option<Rect>,
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItemRef {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    icon_link: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default)]
    has_multiple_items: Option<bool>,
    #[serde(default)]
    background_type: Option<String>,
    #[serde(default)]
    image_quality: Option<f64>,
}

impl RawMatch {
    fn into_result(self, processing_time_ms: Option<u64>) -> Option<RecognitionResult> {
        let id = self.item.id.trim();
        if id.is_empty() || !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence)
        {
            return None;
        }
        let short_name = self
            .item
            .short_name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.item.name.clone());
        let item = ItemRef {
            id: id.to_string(),
            name: self.item.name,
            short_name,
            icon_link: self.item.icon_link.filter(|l| !l.is_empty()),
        };

        let defaults = RecognitionMetadata::default();
        let metadata = match self.metadata {
            Some(raw) => RecognitionMetadata {
                has_multiple_items: raw.has_multiple_items.unwrap_or(defaults.has_multiple_items),
                background_type: raw.background_type.unwrap_or(defaults.background_type),
                image_quality: raw
                    .image_quality
                    .filter(|q| q.is_finite())
                    .unwrap_or(defaults.image_quality),
            },
            None => defaults,
        };

        Some(RecognitionResult {
            item,
            confidence: self.confidence,
            bounding_box: self.bounding_box,
            processing_time_ms,
            metadata,
        })
    }
}
