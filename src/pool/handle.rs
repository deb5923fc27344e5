use std::fmt;
use std::panic;
use std::thread;
use std::time::Duration;

use crate::error::PoolError;

/// Future-like handle to a submitted job.
///
/// `result` blocks the calling thread until the job finishes. If the job
/// panicked, the panic payload is re-raised here unchanged; pool-level
/// failures (cancellation at shutdown, timeout) surface as [`PoolError`].
pub struct JobHandle<T> {
    receiver: flume::Receiver<thread::Result<T>>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(receiver: flume::Receiver<thread::Result<T>>) -> Self {
        Self { receiver }
    }

    /// Block until the job completes and return its result.
    pub fn result(self) -> Result<T, PoolError> {
        match self.receiver.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(flume::RecvError::Disconnected) => Err(PoolError::Cancelled),
        }
    }

    /// Block for at most `timeout` waiting for the job to complete.
    pub fn wait_timeout(self, timeout: Duration) -> Result<T, PoolError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => panic::resume_unwind(payload),
            Err(flume::RecvTimeoutError::Timeout) => Err(PoolError::Timeout(timeout)),
            Err(flume::RecvTimeoutError::Disconnected) => Err(PoolError::Cancelled),
        }
    }

    /// Whether a call to `result` would return without blocking.
    pub fn is_finished(&self) -> bool {
        !self.receiver.is_empty() || self.receiver.is_disconnected()
    }
}

impl<T> fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("is_finished", &self.is_finished())
            .finish()
    }
}
