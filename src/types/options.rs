//! Recognition options

use serde::{Deserialize, Serialize};

/// Options for an image search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecognitionOptions {
    /// Upper bound on returned results. Default: 10.
    pub max_results: usize,
    /// Results scoring below this are dropped (equality is kept). Default: 0.5.
    pub min_confidence: f64,
    /// Let recognizers return variants of the best match. Default: true.
    pub include_variants: bool,
    /// When false, only the single best result is returned. Default: true.
    pub detect_multiple_items: bool,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_confidence: 0.5,
            include_variants: true,
            detect_multiple_items: true,
        }
    }
}

impl RecognitionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    pub fn min_confidence(mut self, c: f64) -> Self {
        self.min_confidence = c;
        self
    }

    pub fn include_variants(mut self, enabled: bool) -> Self {
        self.include_variants = enabled;
        self
    }

    pub fn detect_multiple_items(mut self, enabled: bool) -> Self {
        self.detect_multiple_items = enabled;
        self
    }
}
