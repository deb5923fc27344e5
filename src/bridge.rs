// Sync/async execution bridge.
//
// A blocking caller cannot re-enter a runtime that is already driving its
// thread: nesting a `block_on` there either panics or deadlocks. The bridge
// therefore checks `Handle::try_current()` at the entry point and picks one
// of two paths:
//
// - no runtime on this thread: build a fresh current-thread runtime, run
//   the future to completion, tear the runtime down;
// - runtime present: spawn the future onto that runtime's handle and park
//   the calling thread on a worker-pool job that drives the join handle.
//   The runtime object stays owned by its own threads throughout.

use std::future::Future;
use std::panic;
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::task::{AbortHandle, JoinError};

use crate::context;
use crate::error::{BridgeError, PoolError};
use crate::pool::{self, JobHandle};

/// Run a future to completion from blocking code, regardless of whether a
/// runtime is already driving the current thread.
///
/// The current correlation id is scoped onto the future. A panic inside the
/// future re-raises at this call site with its original payload; an `Err`
/// return value passes through untouched inside `Ok`.
///
/// The running-runtime path assumes a multi-thread runtime: with a
/// current-thread runtime nothing else can drive the spawned task while the
/// caller blocks.
///
/// # Examples
///
/// ```rust
/// let value = perch::run_blocking(async { 40 + 2 }).unwrap();
/// assert_eq!(value, 42);
/// ```
pub fn run_blocking<F>(future: F) -> Result<F::Output, BridgeError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Err(_) => run_direct(future),
        Ok(handle) => dispatch_on(&handle, future)?.wait(),
    }
}

/// Dispatch a future onto the runtime driving the current thread, returning
/// a handle the caller can wait on, time out on, or cancel.
///
/// Fails with [`BridgeError::NoRuntime`] when no runtime is running here;
/// in that situation use [`run_blocking`] instead.
pub fn dispatch<F>(future: F) -> Result<DispatchHandle<F::Output>, BridgeError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
    dispatch_on(&handle, future)
}

fn run_direct<F>(future: F) -> Result<F::Output, BridgeError>
where
    F: Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    let correlation_id = context::get_correlation_id();
    Ok(runtime.block_on(context::with_correlation_scope(correlation_id, future)))
}

fn dispatch_on<F>(handle: &Handle, future: F) -> Result<DispatchHandle<F::Output>, BridgeError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let correlation_id = context::get_correlation_id();
    let task = handle.spawn(context::with_correlation_scope(correlation_id, future));
    let abort = task.abort_handle();

    let wait_handle = handle.clone();
    let job = match pool::submit_to_pool(move || wait_handle.block_on(task)) {
        Ok(job) => job,
        Err(err) => {
            // The task is already running detached; reap it.
            abort.abort();
            return Err(err.into());
        }
    };

    Ok(DispatchHandle { job, abort })
}

/// Handle to a future dispatched cross-thread onto a running runtime.
///
/// Cancellation is advisory: `cancel` and a timed-out `wait_timeout` abort
/// the remote task best-effort, but the future may still run to completion
/// before the abort lands.
#[derive(Debug)]
pub struct DispatchHandle<T> {
    job: JobHandle<Result<T, JoinError>>,
    abort: AbortHandle,
}

impl<T> DispatchHandle<T> {
    /// Block until the dispatched future completes.
    pub fn wait(self) -> Result<T, BridgeError> {
        Self::unpack(self.job.result())
    }

    /// Block for at most `timeout`. On timeout the remote task is aborted
    /// best-effort and the timeout is still reported to the caller.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, BridgeError> {
        let DispatchHandle { job, abort } = self;
        match job.wait_timeout(timeout) {
            Err(PoolError::Timeout(_)) => {
                abort.abort();
                Err(BridgeError::Timeout(timeout))
            }
            outcome => Self::unpack(outcome),
        }
    }

    /// Request cancellation of the dispatched future.
    pub fn cancel(&self) {
        self.abort.abort();
    }

    fn unpack(outcome: Result<Result<T, JoinError>, PoolError>) -> Result<T, BridgeError> {
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    panic::resume_unwind(join_err.into_panic());
                }
                Err(BridgeError::Cancelled)
            }
            Err(pool_err) => Err(BridgeError::Pool(pool_err)),
        }
    }
}
