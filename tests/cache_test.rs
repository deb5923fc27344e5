// Integration tests for the TTL cache.

use std::time::Duration;

use perch::cache::{CacheConfig, TtlCache};

fn cache_of(max_entries: usize, default_ttl: Option<Duration>) -> TtlCache<String> {
    TtlCache::new(Some(CacheConfig {
        max_entries,
        default_ttl,
    }))
}

#[test]
fn inserted_values_are_returned_until_removed() {
    let cache = cache_of(16, None);
    cache.insert("a", "alpha".to_string());
    assert_eq!(cache.get("a"), Some("alpha".to_string()));
    assert_eq!(cache.remove("a"), Some("alpha".to_string()));
    assert_eq!(cache.get("a"), None);
}

#[test]
fn entries_expire_after_their_ttl() {
    let cache = cache_of(16, Some(Duration::from_millis(10)));
    cache.insert("short", "lived".to_string());
    assert_eq!(cache.get("short"), Some("lived".to_string()));
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(cache.get("short"), None);
    assert_eq!(cache.len(), 0);
}

#[test]
fn explicit_ttl_overrides_the_default() {
    let cache = cache_of(16, Some(Duration::from_millis(5)));
    cache.insert_with_ttl("long", "lived".to_string(), None);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.get("long"), Some("lived".to_string()));
}

#[test]
fn eviction_prefers_expired_entries_then_the_oldest() {
    let cache = cache_of(2, None);
    cache.insert_with_ttl("stale", "x".to_string(), Some(Duration::from_millis(5)));
    cache.insert("fresh", "y".to_string());
    std::thread::sleep(Duration::from_millis(20));

    // The expired entry makes room; the live one survives.
    cache.insert("new", "z".to_string());
    assert_eq!(cache.get("fresh"), Some("y".to_string()));
    assert_eq!(cache.get("new"), Some("z".to_string()));

    // Now full of live entries; the oldest goes.
    cache.insert("newest", "w".to_string());
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("fresh"), None);
    assert_eq!(cache.get("newest"), Some("w".to_string()));
}

#[test]
fn overwriting_an_existing_key_does_not_evict() {
    let cache = cache_of(2, None);
    cache.insert("a", "1".to_string());
    cache.insert("b", "2".to_string());
    cache.insert("a", "updated".to_string());
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("a"), Some("updated".to_string()));
    assert_eq!(cache.get("b"), Some("2".to_string()));
}

#[test]
fn purge_expired_reports_how_many_were_dropped() {
    let cache = cache_of(16, Some(Duration::from_millis(5)));
    cache.insert("a", "1".to_string());
    cache.insert("b", "2".to_string());
    cache.insert_with_ttl("keep", "3".to_string(), None);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.purge_expired(), 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn metrics_track_hits_and_misses() {
    let cache = cache_of(16, None);
    cache.insert("a", "1".to_string());
    cache.get("a");
    cache.get("a");
    cache.get("missing");
    let metrics = cache.metrics();
    assert_eq!(metrics.hits, 2);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.entries, 1);
    assert_eq!(metrics.max_entries, 16);
}

#[test]
fn clear_empties_the_cache() {
    let cache = cache_of(16, None);
    cache.insert("a", "1".to_string());
    cache.insert("b", "2".to_string());
    cache.clear();
    assert!(cache.is_empty());
}
