//! Concurrent runner scheduler
//!
//! Units are handed over one at a time by the owning runner and submitted to a
//! [`WorkerPool`] immediately. Their handles are tracked in a completion-ordered
//! queue; `finished()` drains that queue, cancels whatever is left if the wait
//! is interrupted, and always shuts the pool down before returning.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{SchedulerError, WorkerPool};
use crate::models::ClassConfig;
use crate::runner::TestUnit;

/// Scheduling contract between a runner and its executor
pub trait RunnerScheduler: Send + Sync {
    /// Submit a unit without waiting for it
    fn schedule(&self, unit: TestUnit) -> Result<(), SchedulerError>;

    /// Wait for every submitted unit, then release the workers
    fn finished(&self) -> DrainReport;
}

/// Scheduler lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Accepting,
    Draining,
    Closed,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Accepting => write!(f, "accepting"),
            SchedulerState::Draining => write!(f, "draining"),
            SchedulerState::Closed => write!(f, "closed"),
        }
    }
}

/// What a call to `finished()` observed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// Units that ran to completion (successfully or not)
    pub completed: usize,
    /// Units abandoned after an interrupted drain
    pub cancelled: usize,
    pub interrupted: bool,
}

/// Cooperative cancellation signal for a draining scheduler
#[derive(Clone, Debug)]
pub struct InterruptHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl InterruptHandle {
    /// Ask the scheduler to stop waiting; takes effect in (or before) `finished()`
    pub fn interrupt(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_interrupted(&self) -> bool {
        *self.tx.borrow()
    }
}

struct Inner {
    state: SchedulerState,
    pool: Option<WorkerPool>,
    pending: FuturesUnordered<JoinHandle<()>>,
    submitted: usize,
}

/// Scheduler executing units on a fixed-size named worker pool
pub struct ConcurrentScheduler {
    label: String,
    inner: Mutex<Inner>,
    /// Submitted units not yet observed as complete, kept live while draining
    outstanding: AtomicUsize,
    interrupt: Arc<watch::Sender<bool>>,
}

impl ConcurrentScheduler {
    /// Create a scheduler whose pool is labelled `label` and has `threads` workers
    pub fn new(label: impl Into<String>, threads: usize) -> Result<Self, SchedulerError> {
        let label = label.into();
        let pool = WorkerPool::create(&label, threads)?;
        let (tx, _rx) = watch::channel(false);

        Ok(Self {
            label,
            inner: Mutex::new(Inner {
                state: SchedulerState::Idle,
                pool: Some(pool),
                pending: FuturesUnordered::new(),
                submitted: 0,
            }),
            outstanding: AtomicUsize::new(0),
            interrupt: Arc::new(tx),
        })
    }

    /// Create a scheduler sized from a class's concurrency directive
    pub fn for_class(class_name: &str, config: &ClassConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Self::new(class_name, config.threads() as usize)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Name of the underlying pool, `None` once closed
    pub fn pool_name(&self) -> Option<String> {
        self.lock().pool.as_ref().map(|p| p.name().to_string())
    }

    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    /// Units submitted so far
    pub fn submitted(&self) -> usize {
        self.lock().submitted
    }

    /// Units submitted but not yet observed as complete
    pub fn pending(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            tx: self.interrupt.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RunnerScheduler for ConcurrentScheduler {
    fn schedule(&self, unit: TestUnit) -> Result<(), SchedulerError> {
        let mut inner = self.lock();

        let pool = match (inner.state, inner.pool.as_ref()) {
            (SchedulerState::Idle | SchedulerState::Accepting, Some(pool)) => pool,
            (state, _) => {
                return Err(SchedulerError::NotAccepting {
                    scheduler: self.label.clone(),
                    state,
                })
            }
        };

        debug!("Scheduling {} on {}", unit.name(), pool.name());
        let handle = pool.submit(move || unit.run());

        inner.pending.push(handle);
        inner.submitted += 1;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        inner.state = SchedulerState::Accepting;
        Ok(())
    }

    fn finished(&self) -> DrainReport {
        let (pool, mut pending) = {
            let mut inner = self.lock();
            match inner.state {
                SchedulerState::Idle | SchedulerState::Accepting => {}
                state => {
                    debug!("Scheduler {} already {}, nothing to drain", self.label, state);
                    return DrainReport::default();
                }
            }
            inner.state = SchedulerState::Draining;
            (inner.pool.take(), std::mem::take(&mut inner.pending))
        };

        let Some(pool) = pool else {
            self.lock().state = SchedulerState::Closed;
            return DrainReport::default();
        };

        let mut completed = 0;
        let mut interrupt = self.interrupt.subscribe();
        let mut observe = |result: Result<(), tokio::task::JoinError>| {
            if let Err(e) = result {
                warn!("Unit on {} ended abnormally: {}", pool.name(), e);
            }
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            completed += 1;
        };

        let interrupted = pool.block_on(async {
            loop {
                tokio::select! {
                    biased;
                    _ = interrupt_raised(&mut interrupt) => break true,
                    next = pending.next() => match next {
                        Some(result) => observe(result),
                        None => break false,
                    },
                }
            }
        });

        // Units that already ran before the interrupt was seen still count
        let mut cancelled = 0;
        for handle in pending.iter() {
            if handle.is_finished() {
                observe(Ok(()));
            } else {
                handle.abort();
                cancelled += 1;
            }
        }
        drop(pending);
        self.outstanding.store(0, Ordering::SeqCst);

        let report = DrainReport {
            completed,
            cancelled,
            interrupted,
        };

        if report.cancelled > 0 {
            warn!(
                "Drain of {} interrupted: {} unit(s) abandoned and will not report a result",
                self.label, report.cancelled
            );
        }

        let pool_name = pool.name().to_string();
        pool.shutdown_now();
        self.lock().state = SchedulerState::Closed;

        info!(
            "Scheduler {} closed: {} completed, {} cancelled",
            pool_name, report.completed, report.cancelled
        );

        report
    }
}

impl Drop for ConcurrentScheduler {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pool) = inner.pool.take() {
            for handle in inner.pending.iter() {
                handle.abort();
            }
            pool.shutdown_now();
        }
    }
}

impl fmt::Debug for ConcurrentScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ConcurrentScheduler")
            .field("label", &self.label)
            .field("state", &inner.state)
            .field("submitted", &inner.submitted)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

/// Resolves once the interrupt flag is raised
async fn interrupt_raised(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|raised| *raised).await.is_err() {
        std::future::pending::<()>().await;
    }
}
