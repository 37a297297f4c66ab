//! Bounded TTL + LRU store.
//!
//! [`CacheStore`] maps string keys to timestamped [`CacheEntry`] values.
//! Entries expire `ttl` after they were written and are removed lazily when
//! a read finds them expired, or eagerly by [`CacheStore::purge_expired`].
//! When an insert pushes the store over capacity, the least recently read
//! entries are evicted first; entries read at the same instant go in
//! insertion order.
//!
//! The store is guarded by a single mutex so that the check-then-remove in
//! `get` and the insert-then-evict in `set` are atomic with respect to each
//! other. The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::stats::{HitStats, StatsTracker};
use crate::clock::Clock;
use crate::telemetry;

/// Default time-to-live for cache entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of entries per store.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Values that can live in a [`CacheStore`].
///
/// Values reporting themselves empty are never stored.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn is_empty_value(&self) -> bool {
        false
    }
}

impl<T> CacheValue for Vec<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

/// A cached value with its bookkeeping.
///
/// Times are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    pub expires_at: u64,
    pub access_count: u64,
    pub last_accessed: u64,
    /// Insertion order, used to break LRU ties.
    #[serde(default)]
    pub(crate) sequence: u64,
}

impl<T> CacheEntry<T> {
    /// An entry is valid strictly before its expiry time.
    pub fn is_valid_at(&self, now: u64) -> bool {
        now < self.expires_at
    }
}

/// Configuration for a single cache store.
///
/// ```rust
/// # use fleamark::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(250)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries. Default: 100.
    pub max_entries: usize,
    /// Time-to-live used when `set` is given none. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries (at least 1).
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n.max(1);
        self
    }

    /// Set the default time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Per-store counters returned by [`CacheStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

struct StoreState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_sequence: u64,
    dirty: bool,
}

/// Bounded key → value map with TTL expiry and LRU eviction.
pub struct CacheStore<V> {
    name: &'static str,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState<V>>,
    stats: StatsTracker,
}

impl<V: CacheValue> CacheStore<V> {
    /// Create an empty store. `name` labels its metrics and log lines.
    pub fn new(name: &'static str, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            config,
            clock,
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                next_sequence: 0,
                dirty: false,
            }),
            stats: StatsTracker::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a value.
    ///
    /// A valid entry counts as a hit and has its access metadata bumped. A
    /// missing or expired entry counts as a miss; an expired one is removed.
    /// An empty key is ignored entirely.
    pub fn get(&self, key: &str) -> Option<V> {
        if key.is_empty() {
            return None;
        }
        let now = self.clock.now_millis();
        let mut state = self.lock();

        let expired = match state.entries.get_mut(key) {
            Some(entry) if entry.is_valid_at(now) => {
                entry.access_count += 1;
                entry.last_accessed = now;
                let data = entry.data.clone();
                self.stats.record_hit();
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => self.name).increment(1);
                return Some(data);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(key);
            state.dirty = true;
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL, "cache" => self.name)
                .increment(1);
        }
        self.stats.record_miss();
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => self.name).increment(1);
        None
    }

    /// Insert or overwrite a value.
    ///
    /// Ignored when `key` is empty or `value` is empty. Uses the store's
    /// default TTL when `ttl` is `None`. Evicts least recently used entries
    /// if the store is now over capacity.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        if key.is_empty() || value.is_empty_value() {
            return;
        }
        let now = self.clock.now_millis();
        let ttl = ttl.unwrap_or(self.config.ttl);
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let mut state = self.lock();

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                timestamp: now,
                expires_at: now.saturating_add(ttl_ms),
                access_count: 0,
                last_accessed: now,
                sequence,
            },
        );
        state.dirty = true;

        let evicted = evict_overflow(&mut state.entries, self.config.max_entries);
        if evicted > 0 {
            tracing::debug!(cache = self.name, evicted, "evicted least recently used entries");
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "cache" => self.name)
                .increment(evicted as u64);
        }
    }

    /// Read an entry without touching its access metadata or the counters.
    pub fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lock().entries.get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Remove every entry. Counters are left alone.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.dirty = true;
    }

    /// Remove all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| entry.is_valid_at(now));
        let purged = before - state.entries.len();
        if purged > 0 {
            state.dirty = true;
            metrics::counter!(telemetry::CACHE_EXPIRATIONS_TOTAL, "cache" => self.name)
                .increment(purged as u64);
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        let entries = self.len();
        let HitStats {
            hits,
            misses,
            hit_rate,
            ..
        } = self.stats.snapshot();
        StoreStats {
            entries,
            hits,
            misses,
            hit_rate,
        }
    }

    pub fn hit_stats(&self) -> HitStats {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Copy of every entry, for persistence.
    pub fn snapshot(&self) -> HashMap<String, CacheEntry<V>> {
        self.lock().entries.clone()
    }

    /// Replace the contents with previously persisted entries.
    ///
    /// Expired entries are dropped and the result is trimmed to capacity.
    /// The store is marked dirty only if that changed anything.
    pub fn restore(&self, mut entries: HashMap<String, CacheEntry<V>>) {
        let now = self.clock.now_millis();
        let loaded = entries.len();
        entries.retain(|key, entry| !key.is_empty() && entry.is_valid_at(now));
        let evicted = evict_overflow(&mut entries, self.config.max_entries);

        let mut state = self.lock();
        state.next_sequence = entries
            .values()
            .map(|e| e.sequence + 1)
            .max()
            .unwrap_or(0);
        state.dirty = entries.len() != loaded || evicted > 0;
        state.entries = entries;
    }

    /// Whether a structural change happened since the last call; resets the flag.
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.lock().dirty)
    }

    /// Approximate serialized size of the stored entries, in bytes.
    pub fn size_bytes(&self) -> usize {
        let state = self.lock();
        serde_json::to_vec(&state.entries)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Evict least recently accessed entries until `len <= capacity`.
///
/// Ties on `last_accessed` are broken by insertion sequence.
fn evict_overflow<V>(entries: &mut HashMap<String, CacheEntry<V>>, capacity: usize) -> usize {
    let overflow = entries.len().saturating_sub(capacity);
    if overflow == 0 {
        return 0;
    }
    let mut order: Vec<(u64, u64, String)> = entries
        .iter()
        .map(|(key, e)| (e.last_accessed, e.sequence, key.clone()))
        .collect();
    order.sort_unstable();
    for (_, _, key) in order.into_iter().take(overflow) {
        entries.remove(&key);
    }
    overflow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(last_accessed: u64, sequence: u64) -> CacheEntry<Vec<u8>> {
        CacheEntry {
            data: vec![1],
            timestamp: 0,
            expires_at: u64::MAX,
            access_count: 0,
            last_accessed,
            sequence,
        }
    }

    #[test]
    fn evicts_oldest_access_first() {
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry(30, 0));
        entries.insert("b".to_string(), entry(10, 1));
        entries.insert("c".to_string(), entry(20, 2));

        assert_eq!(evict_overflow(&mut entries, 2), 1);
        assert!(!entries.contains_key("b"));
        assert!(entries.contains_key("a"));
        assert!(entries.contains_key("c"));
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut entries = HashMap::new();
        entries.insert("late".to_string(), entry(5, 9));
        entries.insert("early".to_string(), entry(5, 2));
        entries.insert("mid".to_string(), entry(5, 4));

        assert_eq!(evict_overflow(&mut entries, 1), 2);
        assert!(entries.contains_key("late"));
    }

    #[test]
    fn nothing_evicted_under_capacity() {
        let mut entries = HashMap::new();
        entries.insert("a".to_string(), entry(1, 0));
        assert_eq!(evict_overflow(&mut entries, 1), 0);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn validity_is_strictly_before_expiry() {
        let mut e = entry(0, 0);
        e.expires_at = 100;
        assert!(e.is_valid_at(99));
        assert!(!e.is_valid_at(100));
    }

    #[test]
    fn config_builder_pattern() {
        let config = CacheConfig::new()
            .max_entries(0)
            .ttl(Duration::from_secs(1));
        assert_eq!(config.max_entries, 1);
        assert_eq!(config.ttl, Duration::from_secs(1));
        assert_eq!(CacheConfig::default().max_entries, 100);
        assert_eq!(CacheConfig::default().ttl, Duration::from_secs(300));
    }
}
