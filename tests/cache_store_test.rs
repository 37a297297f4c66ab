//! Tests for the TTL + LRU cache store.

use std::sync::Arc;
use std::time::Duration;

use fleamark::{CacheConfig, CacheStore, ManualClock};

fn store(max_entries: usize, ttl: Duration) -> (CacheStore<Vec<u32>>, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    let config = CacheConfig::new().max_entries(max_entries).ttl(ttl);
    (CacheStore::new("test", config, Arc::new(clock.clone())), clock)
}

#[test]
fn get_returns_value_before_expiry() {
    let (store, clock) = store(10, Duration::from_secs(300));
    store.set("k", vec![1, 2], None);

    clock.advance(Duration::from_secs(299));
    assert_eq!(store.get("k"), Some(vec![1, 2]));

    let stats = store.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 0);
}

#[test]
fn entry_expires_at_ttl_and_is_removed() {
    let (store, clock) = store(10, Duration::from_secs(300));
    store.set("k", vec![1], None);

    clock.advance(Duration::from_secs(300));
    assert_eq!(store.get("k"), None);
    assert!(!store.contains_key("k"));
    assert_eq!(store.stats().misses, 1);
}

#[test]
fn per_entry_ttl_overrides_default() {
    let (store, clock) = store(10, Duration::from_secs(300));
    store.set("short", vec![1], Some(Duration::from_secs(1)));
    store.set("long", vec![2], None);

    clock.advance(Duration::from_secs(2));
    assert_eq!(store.get("short"), None);
    assert_eq!(store.get("long"), Some(vec![2]));
}

#[test]
fn oversized_ttl_saturates_instead_of_wrapping() {
    let (store, clock) = store(10, Duration::from_secs(300));
    // 2^64 ms plus 384 ms.
    let ttl = Duration::from_secs(18_446_744_073_709_552);
    store.set("k", vec![1], Some(ttl));

    clock.advance(Duration::from_secs(1));
    assert_eq!(store.get("k"), Some(vec![1]));
    assert_eq!(store.peek("k").unwrap().expires_at, u64::MAX);
}

#[test]
fn overwrite_resets_timestamps() {
    let (store, clock) = store(10, Duration::from_secs(10));
    store.set("k", vec![1], None);
    clock.advance(Duration::from_secs(8));
    store.set("k", vec![2], None);
    clock.advance(Duration::from_secs(8));

    assert_eq!(store.get("k"), Some(vec![2]));
    let entry = store.peek("k").unwrap();
    assert_eq!(entry.access_count, 1);
}

#[test]
fn get_bumps_access_metadata() {
    let (store, clock) = store(10, Duration::from_secs(300));
    store.set("k", vec![1], None);
    clock.advance(Duration::from_millis(50));
    store.get("k");
    store.get("k");

    let entry = store.peek("k").unwrap();
    assert_eq!(entry.access_count, 2);
    assert_eq!(entry.last_accessed, 1_000_050);
    assert_eq!(entry.timestamp, 1_000_000);
}

#[test]
fn capacity_overflow_evicts_least_recently_accessed() {
    let (store, clock) = store(100, Duration::from_secs(3600));
    for i in 0..100 {
        store.set(&format!("key-{i}"), vec![i], None);
        clock.advance(Duration::from_millis(1));
    }

    // key-0 is the oldest insert but was just read, so key-1 is now the LRU.
    assert_eq!(store.get("key-0"), Some(vec![0]));
    clock.advance(Duration::from_millis(1));
    store.set("key-100", vec![100], None);

    assert_eq!(store.len(), 100);
    assert!(store.contains_key("key-0"));
    assert!(!store.contains_key("key-1"));
    assert!(store.contains_key("key-100"));
}

#[test]
fn eviction_ties_go_to_oldest_insert() {
    let (store, _clock) = store(2, Duration::from_secs(60));
    store.set("a", vec![1], None);
    store.set("b", vec![2], None);
    store.set("c", vec![3], None);

    assert!(!store.contains_key("a"));
    assert!(store.contains_key("b"));
    assert!(store.contains_key("c"));
}

#[test]
fn empty_keys_and_values_are_ignored() {
    let (store, _clock) = store(10, Duration::from_secs(60));
    store.set("", vec![1], None);
    store.set("empty", vec![], None);

    assert!(store.is_empty());
    assert_eq!(store.get(""), None);
    // Blank-key lookups do not count as misses.
    assert_eq!(store.stats().misses, 0);
}

#[test]
fn purge_expired_drops_only_expired() {
    let (store, clock) = store(10, Duration::from_secs(10));
    store.set("old", vec![1], None);
    clock.advance(Duration::from_secs(5));
    store.set("new", vec![2], None);
    clock.advance(Duration::from_secs(6));

    assert_eq!(store.purge_expired(), 1);
    assert!(store.contains_key("new"));
    assert!(!store.contains_key("old"));
}

#[test]
fn hit_rate_is_zero_without_requests() {
    let (store, _clock) = store(10, Duration::from_secs(60));
    assert_eq!(store.stats().hit_rate, 0.0);

    store.set("k", vec![1], None);
    store.get("k");
    store.get("missing");
    assert_eq!(store.stats().hit_rate, 0.5);
}

#[test]
fn dirty_flag_tracks_structural_changes() {
    let (store, _clock) = store(10, Duration::from_secs(60));
    assert!(!store.take_dirty());

    store.set("k", vec![1], None);
    assert!(store.take_dirty());
    assert!(!store.take_dirty());

    // Reads of valid entries are not structural changes.
    store.get("k");
    assert!(!store.take_dirty());

    store.clear();
    assert!(store.take_dirty());
}

#[test]
fn restore_drops_expired_and_trims_to_capacity() {
    let (source, clock) = store(10, Duration::from_secs(60));
    for i in 0..5 {
        source.set(&format!("k{i}"), vec![i], None);
        clock.advance(Duration::from_millis(1));
    }
    source.set("short", vec![9], Some(Duration::from_millis(1)));
    clock.advance(Duration::from_millis(10));

    let target = CacheStore::<Vec<u32>>::new(
        "target",
        CacheConfig::new().max_entries(3),
        Arc::new(clock.clone()),
    );
    target.restore(source.snapshot());

    assert_eq!(target.len(), 3);
    assert!(!target.contains_key("short"));
    assert!(target.contains_key("k4"));
    assert!(!target.contains_key("k0"));
    assert!(target.take_dirty());
}

#[test]
fn size_bytes_grows_with_content() {
    let (store, _clock) = store(10, Duration::from_secs(60));
    let empty = store.size_bytes();
    store.set("k", vec![1, 2, 3], None);
    assert!(store.size_bytes() > empty);
}
