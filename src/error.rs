use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors related to the worker pool.
///
/// Panics raised inside submitted work are not represented here: they are
/// transported to the waiting caller and re-raised unchanged by
/// [`JobHandle::result`](crate::pool::JobHandle::result).
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Worker pool is shutting down")]
    ShuttingDown,
    #[error("Pool queue is full (capacity: {capacity})")]
    QueueFull { capacity: usize },
    #[error("Submitted work was cancelled before it ran")]
    Cancelled,
    #[error("Timed out after {0:?} waiting for a result")]
    Timeout(Duration),
    #[error("Thread setup error: {0}")]
    ThreadSetup(String),
    #[error("Internal pool error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Errors related to the sync/async bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("No runtime is running on this thread")]
    NoRuntime,
    #[error("Failed to build a runtime for direct execution: {0}")]
    RuntimeBuild(#[from] io::Error),
    #[error("Dispatched task was cancelled")]
    Cancelled,
    #[error("Timed out after {0:?} waiting for a dispatched task")]
    Timeout(Duration),
    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),
}
