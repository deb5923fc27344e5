// Token-bucket rate limiter.
//
// The bucket refills lazily from elapsed time on each acquisition attempt;
// there is no background thread. Blocking acquires sleep for the computed
// deficit rather than spinning.

use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Configuration for a [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Burst capacity: the maximum number of tokens the bucket holds.
    pub capacity: u32,

    /// Steady-state refill rate, in tokens per second.
    pub refill_per_sec: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_sec: 5.0,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A shareable token-bucket limiter. Each acquisition consumes one token;
/// the bucket starts full.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(config: Option<RateLimiterConfig>) -> Self {
        let config = config.unwrap_or_default();
        let bucket = Bucket {
            tokens: config.capacity as f64,
            last_refill: Instant::now(),
        };
        Self {
            config,
            bucket: Mutex::new(bucket),
        }
    }

    /// Take one token if available, without blocking.
    pub fn try_acquire(&self) -> bool {
        self.try_take().is_ok()
    }

    /// Block until a token is available.
    pub fn acquire(&self) {
        loop {
            match self.try_take() {
                Ok(()) => return,
                Err(wait) => thread::sleep(wait),
            }
        }
    }

    /// Block for at most `timeout` waiting for a token. Returns whether a
    /// token was acquired.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_take() {
                Ok(()) => return true,
                Err(wait) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let remaining = deadline - now;
                    if wait >= remaining {
                        thread::sleep(remaining);
                        return self.try_take().is_ok();
                    }
                    thread::sleep(wait);
                }
            }
        }
    }

    /// Tokens currently available (after refill), for diagnostics.
    pub fn available(&self) -> f64 {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket, Instant::now());
        bucket.tokens
    }

    // Take one token or report how long until one refills.
    fn try_take(&self) -> Result<(), Duration> {
        let mut bucket = self.lock_bucket();
        self.refill(&mut bucket, Instant::now());
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }
        let deficit = 1.0 - bucket.tokens;
        let rate = self.config.refill_per_sec.max(f64::MIN_POSITIVE);
        Err(Duration::try_from_secs_f64(deficit / rate).unwrap_or(Duration::MAX))
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens =
            (bucket.tokens + elapsed * self.config.refill_per_sec).min(self.config.capacity as f64);
        bucket.last_refill = now;
    }

    fn lock_bucket(&self) -> std::sync::MutexGuard<'_, Bucket> {
        match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
