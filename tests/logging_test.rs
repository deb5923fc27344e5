// Integration tests for the cached structured logger.

use std::sync::Arc;

use serde_json::json;
use tracing::Level;

use perch::logging::{self, get_cached_logger};

#[test]
fn identical_lookups_return_the_identical_instance() {
    let a = get_cached_logger("cache-identity", Level::INFO);
    let b = get_cached_logger("cache-identity", Level::INFO);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn different_levels_map_to_different_instances() {
    let info = get_cached_logger("cache-level", Level::INFO);
    let debug = get_cached_logger("cache-level", Level::DEBUG);
    assert!(!Arc::ptr_eq(&info, &debug));
    assert_eq!(info.name(), debug.name());
}

#[test]
fn concurrent_first_access_constructs_one_instance() {
    let loggers: Vec<_> = (0..8)
        .map(|_| std::thread::spawn(|| get_cached_logger("cache-race", Level::WARN)))
        .collect::<Vec<_>>()
        .into_iter()
        .map(|t| t.join().unwrap())
        .collect();
    for logger in &loggers[1..] {
        assert!(Arc::ptr_eq(&loggers[0], logger));
    }
}

#[test]
fn payload_carries_logger_name_and_caller_fields() {
    let logger = get_cached_logger("payload", Level::INFO);
    let payload = logger.payload(&[("user", json!("u1")), ("attempt", json!(2))]);
    assert_eq!(payload.get("logger"), Some(&json!("payload")));
    assert_eq!(payload.get("user"), Some(&json!("u1")));
    assert_eq!(payload.get("attempt"), Some(&json!(2)));
}

#[test]
fn reserved_message_key_is_stripped_from_caller_fields() {
    let logger = get_cached_logger("payload-reserved", Level::INFO);
    let payload = logger.payload(&[("message", json!("smuggled")), ("ok", json!(true))]);
    assert!(payload.get("message").is_none());
    assert_eq!(payload.get("ok"), Some(&json!(true)));
}

#[test]
fn payload_carries_the_current_correlation_id() {
    let logger = get_cached_logger("payload-correlation", Level::INFO);

    perch::set_correlation_id(Some("req-log-1".to_string()));
    let payload = logger.payload(&[]);
    assert_eq!(payload.get("correlation_id"), Some(&json!("req-log-1")));
    perch::clear_correlation_id();

    let payload = logger.payload(&[]);
    assert!(payload.get("correlation_id").is_none());
}

#[test]
fn logging_never_panics_even_without_an_installed_subscriber() {
    let logger = get_cached_logger("no-subscriber", Level::DEBUG);
    logger.debug("plain");
    logger.info_kv("structured", &[("k", json!("v"))]);
    logger.warn_kv("reserved", &[("message", json!("ignored"))]);
    logger.error("last");
}

#[test]
fn records_below_the_configured_level_are_dropped_silently() {
    // A WARN logger drops DEBUG/INFO records; nothing observable should
    // happen, and nothing should panic.
    let logger = get_cached_logger("leveled", Level::WARN);
    logger.debug("dropped");
    logger.info("dropped");
    logger.warn("kept");
}

#[test]
fn init_presets_are_safe_to_call_repeatedly() {
    logging::init_test();
    logging::init_test();
    logging::init_default();
    let _dispatch = logging::current_subscriber();
}
