//! Cache key types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalised text-search cache key: the query lower-cased and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextSearchKey(String);

impl TextSearchKey {
    /// Normalise a raw query. Returns `None` when nothing is left.
    pub fn new(query: &str) -> Option<Self> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextSearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content-derived, order-independent key for a set of images.
///
/// Produced by [`crate::hashing`]; a lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageFingerprint(String);

impl ImageFingerprint {
    /// Wrap an existing hex digest (e.g. one received from a caller).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
