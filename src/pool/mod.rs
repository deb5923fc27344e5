// Bounded worker pool for blocking work.
//
// The pool owns a fixed set of named OS threads pulling jobs from a bounded
// flume channel. A process-wide shared pool is built lazily on first use;
// `shutdown_shared_pool` drains and joins it deterministically for callers
// that do not want to rely on process teardown.

mod handle;
mod worker;

pub use self::handle::JobHandle;

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lazy_static::lazy_static;

use crate::context;
use crate::error::PoolError;
use self::worker::{Worker, WorkerConfig};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Configuration for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker threads.
    pub pool_size: usize,

    /// Maximum number of queued-but-not-started jobs. Submissions beyond
    /// this are rejected with [`PoolError::QueueFull`].
    pub queue_capacity: usize,

    /// Duration an idle worker waits for work before re-checking the
    /// shutdown flag.
    pub idle_sleep_duration: Duration,

    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            queue_capacity: 1024,
            idle_sleep_duration: Duration::from_millis(10),
            thread_name_prefix: "perch-worker".to_string(),
        }
    }
}

/// Default pool size: enough headroom for I/O-bound work without letting a
/// large machine spawn an unreasonable number of threads.
pub(crate) fn default_pool_size() -> usize {
    (num_cpus::get() + 4).min(32)
}

/// Metrics about the pool state.
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub pool_size: usize,
    pub queue_length: usize,
    pub is_shutting_down: bool,
}

/// A bounded set of reusable OS threads executing submitted callables.
///
/// Failure semantics: a panic inside submitted work is caught on the worker
/// (the thread survives) and re-raised unchanged when the caller asks the
/// returned [`JobHandle`] for the result. The pool never swallows it.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    sender: flume::Sender<Job>,
    // Kept so queued-but-not-started work can be drained at shutdown.
    receiver: flume::Receiver<Job>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    is_shutting_down: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Create a new pool, spawning its worker threads immediately.
    pub fn new(config: Option<WorkerPoolConfig>) -> Result<Self, PoolError> {
        let config = config.unwrap_or_default();
        let (sender, receiver) = flume::bounded(config.queue_capacity);
        let is_shutting_down = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.pool_size);
        for worker_id in 0..config.pool_size {
            let worker = Worker::new(
                worker_id,
                receiver.clone(),
                is_shutting_down.clone(),
                WorkerConfig {
                    idle_sleep_duration: config.idle_sleep_duration,
                    thread_name_prefix: config.thread_name_prefix.clone(),
                },
            );
            match worker.spawn() {
                Ok(join_handle) => workers.push(join_handle),
                Err(err) => {
                    // Already-spawned workers exit once the channel closes.
                    is_shutting_down.store(true, Ordering::Release);
                    return Err(err);
                }
            }
        }

        tracing::debug!(
            pool_size = config.pool_size,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Ok(Self {
            config,
            sender,
            receiver,
            workers: Mutex::new(workers),
            is_shutting_down,
        })
    }

    /// Queue a callable for execution off the calling thread.
    ///
    /// The submitting context's correlation id is captured here and
    /// installed on the worker thread for the duration of the job, so log
    /// lines emitted by the job correlate with the caller's.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let pool = perch::WorkerPool::new(None).unwrap();
    /// let handle = pool.submit(|| 2 + 2).unwrap();
    /// assert_eq!(handle.result().unwrap(), 4);
    /// ```
    pub fn submit<F, T>(&self, f: F) -> Result<JobHandle<T>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_shutting_down.load(Ordering::Acquire) {
            return Err(PoolError::ShuttingDown);
        }

        let (tx, rx) = flume::bounded(1);
        let correlation_id = context::get_correlation_id();
        let job: Job = Box::new(move || {
            let previous = context::get_correlation_id();
            context::set_correlation_id(correlation_id);
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            context::set_correlation_id(previous);
            // Receiver may have been dropped; the result is simply discarded.
            let _ = tx.send(outcome);
        });

        match self.sender.try_send(job) {
            Ok(()) => Ok(JobHandle::new(rx)),
            Err(flume::TrySendError::Full(_)) => Err(PoolError::QueueFull {
                capacity: self.config.queue_capacity,
            }),
            Err(flume::TrySendError::Disconnected(_)) => Err(PoolError::ShuttingDown),
        }
    }

    /// Shut the pool down: reject new submissions, cancel queued-but-not-
    /// started work, let in-flight work finish, then join the workers.
    ///
    /// Idempotent; the second and later calls return immediately. Handles of
    /// cancelled jobs observe [`PoolError::Cancelled`].
    pub fn shutdown(&self) {
        if self.is_shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut cancelled = 0usize;
        while let Ok(job) = self.receiver.try_recv() {
            drop(job);
            cancelled += 1;
        }

        let workers = match self.workers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for join_handle in workers {
            let _ = join_handle.join();
        }

        tracing::debug!(
            pool_size = self.config.pool_size,
            cancelled,
            "worker pool shut down"
        );
    }

    /// Whether shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Acquire)
    }

    /// Snapshot of the pool state.
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            pool_size: self.config.pool_size,
            queue_length: self.sender.len(),
            is_shutting_down: self.is_shutting_down(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("pool_size", &self.config.pool_size)
            .field("queue_length", &self.sender.len())
            .field("is_shutting_down", &self.is_shutting_down())
            .finish()
    }
}

lazy_static! {
    static ref SHARED_POOL: Mutex<Option<Arc<WorkerPool>>> = Mutex::new(None);
}

/// Process-wide shared pool, constructed with default configuration on
/// first use. Concurrent first callers race on the mutex; exactly one of
/// them builds the pool. After an explicit [`shutdown_shared_pool`] the next
/// call builds a fresh pool.
pub fn shared_pool() -> Result<Arc<WorkerPool>, PoolError> {
    let mut slot = match SHARED_POOL.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(pool) = slot.as_ref() {
        if !pool.is_shutting_down() {
            return Ok(pool.clone());
        }
    }
    let pool = Arc::new(WorkerPool::new(None)?);
    *slot = Some(pool.clone());
    Ok(pool)
}

/// Submit a callable to the process-wide shared pool.
///
/// # Examples
///
/// ```rust
/// let handle = perch::submit_to_pool(|| 2 + 2).unwrap();
/// assert_eq!(handle.result().unwrap(), 4);
/// ```
pub fn submit_to_pool<F, T>(f: F) -> Result<JobHandle<T>, PoolError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    shared_pool()?.submit(f)
}

/// Shut down the process-wide shared pool, if it was ever built.
///
/// Statics are not dropped at process exit, so callers that want a
/// deterministic drain-and-join call this from their teardown path. Safe to
/// call any number of times.
pub fn shutdown_shared_pool() {
    let taken = match SHARED_POOL.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(pool) = taken {
        pool.shutdown();
    }
}
