//! Telemetry metric name constants.
//!
//! Centralised metric names for fleamark operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fleamark_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `cache`: cache instance: "text" or "image"
//! - `recognizer`: recognizer name (e.g. "http", "catalog")
//! - `status`: outcome: "ok", "empty", "error" or "timeout"
//! - `operation`: persistence operation: "load" or "save"

/// Cache lookups that returned a valid entry.
///
/// Labels: `cache`.
pub const CACHE_HITS_TOTAL: &str = "fleamark_cache_hits_total";

/// Cache lookups that found nothing or an expired entry.
///
/// Labels: `cache`.
pub const CACHE_MISSES_TOTAL: &str = "fleamark_cache_misses_total";

/// Entries removed by LRU eviction.
///
/// Labels: `cache`.
pub const CACHE_EVICTIONS_TOTAL: &str = "fleamark_cache_evictions_total";

/// Entries removed because their TTL elapsed (lazy or swept).
///
/// Labels: `cache`.
pub const CACHE_EXPIRATIONS_TOTAL: &str = "fleamark_cache_expirations_total";

/// Recognizer invocations.
///
/// Labels: `recognizer`, `status`.
pub const RECOGNITIONS_TOTAL: &str = "fleamark_recognitions_total";

/// Recognizer call duration in seconds.
///
/// Labels: `recognizer`.
pub const RECOGNITION_DURATION_SECONDS: &str = "fleamark_recognition_duration_seconds";

/// Images for which the fallback recognizer was consulted.
pub const RECOGNITION_FALLBACKS_TOTAL: &str = "fleamark_recognition_fallbacks_total";

/// Retry attempts (not counting the initial call).
///
/// Labels: `recognizer`.
pub const RECOGNITION_RETRIES_TOTAL: &str = "fleamark_recognition_retries_total";

/// Failed snapshot loads or saves.
///
/// Labels: `cache`, `operation`.
pub const PERSISTENCE_FAILURES_TOTAL: &str = "fleamark_persistence_failures_total";

/// Image searches served.
///
/// Labels: `outcome` ("hit" | "miss").
pub const SEARCHES_TOTAL: &str = "fleamark_searches_total";

/// Cache writes skipped because a newer search started first.
pub const STALE_WRITES_DISCARDED_TOTAL: &str = "fleamark_stale_writes_discarded_total";
