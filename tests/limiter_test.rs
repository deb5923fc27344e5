// Integration tests for the token-bucket rate limiter.

use std::time::{Duration, Instant};

use perch::limiter::{RateLimiter, RateLimiterConfig};

fn limiter(capacity: u32, refill_per_sec: f64) -> RateLimiter {
    RateLimiter::new(Some(RateLimiterConfig {
        capacity,
        refill_per_sec,
    }))
}

#[test]
fn burst_up_to_capacity_then_refuse() {
    let limiter = limiter(3, 0.5);
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
}

#[test]
fn tokens_refill_over_time() {
    let limiter = limiter(1, 100.0);
    assert!(limiter.try_acquire());
    assert!(!limiter.try_acquire());
    std::thread::sleep(Duration::from_millis(50));
    assert!(limiter.try_acquire());
}

#[test]
fn acquire_blocks_until_a_token_is_available() {
    let limiter = limiter(1, 50.0);
    limiter.acquire();
    let start = Instant::now();
    // Refill rate of 50/s means the next token lands ~20ms out.
    limiter.acquire();
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(10), "waited {:?}", waited);
    assert!(waited < Duration::from_secs(2), "waited {:?}", waited);
}

#[test]
fn acquire_timeout_fails_fast_when_starved() {
    let limiter = limiter(1, 0.1);
    assert!(limiter.try_acquire());
    let start = Instant::now();
    assert!(!limiter.acquire_timeout(Duration::from_millis(20)));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn acquire_timeout_succeeds_when_a_token_arrives_in_time() {
    let limiter = limiter(1, 100.0);
    assert!(limiter.try_acquire());
    assert!(limiter.acquire_timeout(Duration::from_millis(500)));
}

#[test]
fn available_reports_the_refilled_balance() {
    let limiter = limiter(5, 1.0);
    assert!(limiter.available() >= 4.9);
    limiter.acquire();
    assert!(limiter.available() < 5.0);
}
