use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::error::PoolError;
use super::Job;

/// Per-worker configuration.
#[derive(Debug, Clone)]
pub(crate) struct WorkerConfig {
    pub idle_sleep_duration: Duration,
    pub thread_name_prefix: String,
}

/// A single pool worker: one named OS thread pulling jobs from the shared
/// queue until shutdown.
pub(crate) struct Worker {
    id: usize,
    queue: flume::Receiver<Job>,
    is_shutting_down: Arc<AtomicBool>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: flume::Receiver<Job>,
        is_shutting_down: Arc<AtomicBool>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            id,
            queue,
            is_shutting_down,
            config,
        }
    }

    pub fn spawn(self) -> Result<thread::JoinHandle<()>, PoolError> {
        let name = format!("{}-{}", self.config.thread_name_prefix, self.id);
        thread::Builder::new()
            .name(name)
            .spawn(move || self.run())
            .map_err(|e| PoolError::ThreadSetup(e.to_string()))
    }

    fn run(self) {
        tracing::trace!(worker_id = self.id, "worker started");
        loop {
            match self.queue.recv_timeout(self.config.idle_sleep_duration) {
                // Jobs contain their own panic guard, so the worker survives
                // a panicking callable.
                Ok(job) => job(),
                Err(flume::RecvTimeoutError::Timeout) => {
                    if self.is_shutting_down.load(Ordering::Acquire) && self.queue.is_empty() {
                        break;
                    }
                }
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::trace!(worker_id = self.id, "worker stopped");
    }
}
