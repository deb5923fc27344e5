// Perch: execution-bridge utilities for mixed sync/async codebases.
//
// This crate is the core utility layer of an SDK whose callers are written
// in blocking style but whose I/O is asynchronous. It provides a bounded
// process-wide worker pool, a bridge that runs a future to completion from
// any thread (with or without a tokio runtime already driving it), a
// context-local correlation id, and a cached structured-logger facade that
// stamps that id onto every record.

pub mod bridge;
pub mod cache;
pub mod context;
pub mod error;
pub mod limiter;
pub mod logging;
pub mod pool;

// Re-export the call surface most users need.
pub use bridge::{DispatchHandle, dispatch, run_blocking};
pub use cache::{CacheConfig, CacheMetrics, TtlCache};
pub use context::{
    clear_correlation_id, get_correlation_id, new_correlation_id, set_correlation_id,
    with_correlation_scope,
};
pub use error::{BridgeError, PoolError};
pub use limiter::{RateLimiter, RateLimiterConfig};
pub use logging::{Logger, get_cached_logger};
pub use pool::{
    JobHandle, PoolMetrics, WorkerPool, WorkerPoolConfig, shared_pool, shutdown_shared_pool,
    submit_to_pool,
};
