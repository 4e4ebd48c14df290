//! Test execution engine
//!
//! Named worker pools, the concurrent scheduler that feeds them, and
//! multi-round execution for flakiness analysis.

mod pool;
mod rounds;
mod scheduler;

use thiserror::Error;

use crate::models::DirectiveError;

pub use pool::WorkerPool;
pub use rounds::{AggregateResult, RoundRunner, RoundStop, UnitStats};
pub use scheduler::{
    ConcurrentScheduler, DrainReport, InterruptHandle, RunnerScheduler, SchedulerState,
};

/// Scheduler and pool errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Worker pool {0} must have at least one thread")]
    InvalidPoolSize(String),

    #[error("Failed to create worker pool {pool}: {reason}")]
    PoolCreation { pool: String, reason: String },

    #[error("Scheduler {scheduler} is {state} and no longer accepts units")]
    NotAccepting {
        scheduler: String,
        state: SchedulerState,
    },

    #[error(transparent)]
    InvalidDirective(#[from] DirectiveError),
}
