//! Named worker pools
//!
//! Each pool is a dedicated tokio runtime whose blocking pool is capped at the
//! requested size. Jobs run on blocking threads named
//! `<label>-<poolNumber>-thread-<threadNumber>`, so stack dumps and log lines
//! can be traced back to the test class that owns the pool.
//!
//! The runtime itself is never driven: blocking jobs complete their handles
//! directly, so waiting on them works from plain threads and from inside
//! another runtime alike.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::debug;

use super::SchedulerError;

/// Process-wide pool counter, never reset
static POOL_NUMBER: AtomicUsize = AtomicUsize::new(1);

/// Fixed-size pool of named worker threads
pub struct WorkerPool {
    name: String,
    size: usize,
    handle: Handle,
    /// Taken on drop, shut down without blocking
    runtime: Option<Runtime>,
}

impl WorkerPool {
    /// Create a pool of `size` threads labelled with `pool_label`.
    ///
    /// Threads are started on first submission; the pool name is fixed here.
    pub fn create(pool_label: &str, size: usize) -> Result<Self, SchedulerError> {
        if size == 0 {
            return Err(SchedulerError::InvalidPoolSize(pool_label.to_string()));
        }

        let name = format!("{}-{}", pool_label, POOL_NUMBER.fetch_add(1, Ordering::SeqCst));
        let thread_number = Arc::new(AtomicUsize::new(1));
        let thread_prefix = name.clone();

        let runtime = Builder::new_current_thread()
            .enable_all()
            .max_blocking_threads(size)
            .thread_name_fn(move || {
                format!(
                    "{}-thread-{}",
                    thread_prefix,
                    thread_number.fetch_add(1, Ordering::SeqCst)
                )
            })
            .build()
            .map_err(|e| SchedulerError::PoolCreation {
                pool: name.clone(),
                reason: e.to_string(),
            })?;

        debug!("Created worker pool {} with {} threads", name, size);

        Ok(Self {
            name,
            size,
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
        })
    }

    /// `<label>-<poolNumber>`, the prefix of every worker thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Submit a job; the handle resolves when the job has finished
    pub fn submit<F>(&self, job: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.spawn_blocking(job)
    }

    /// Drive a future to completion on the calling thread.
    ///
    /// Safe to call from async code. The future must not rely on tokio's
    /// timer or IO drivers; job handles and `sync` primitives are fine.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        futures::executor::block_on(future)
    }

    /// Shut down without waiting for running jobs; queued jobs never start
    pub fn shutdown_now(self) {
        debug!("Shutting down worker pool {}", self.name);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // A plain runtime drop blocks, which panics inside async code
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("size", &self.size)
            .finish()
    }
}
