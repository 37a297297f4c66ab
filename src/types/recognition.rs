//! Recognition result types

use serde::{Deserialize, Serialize};

use super::item::ItemRef;

/// A candidate item match for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub item: ItemRef,
    /// Normalised match score in `[0, 1]`.
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
    #[serde(default)]
    pub metadata: RecognitionMetadata,
}

impl RecognitionResult {
    pub fn new(item: ItemRef, confidence: f64) -> Self {
        Self {
            item,
            confidence,
            bounding_box: None,
            processing_time_ms: None,
            metadata: RecognitionMetadata::default(),
        }
    }

    pub fn with_bounding_box(mut self, rect: Rect) -> Self {
        self.bounding_box = Some(rect);
        self
    }

    pub fn with_processing_time(mut self, millis: u64) -> Self {
        self.processing_time_ms = Some(millis);
        self
    }

    pub fn with_metadata(mut self, metadata: RecognitionMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Image-level observations reported alongside a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionMetadata {
    pub has_multiple_items: bool,
    pub background_type: String,
    pub image_quality: f64,
}

impl Default for RecognitionMetadata {
    fn default() -> Self {
        Self {
            has_multiple_items: false,
            background_type: "unknown".to_string(),
            image_quality: 0.0,
        }
    }
}

/// Axis-aligned region of the image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
