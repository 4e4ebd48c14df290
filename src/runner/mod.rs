//! Test runners
//!
//! Runners enumerate the units of a test class, hand them to a scheduler in
//! declaration order, and report results through a [`RunNotifier`].
//!
//! ## Runners
//!
//! - [`ClassRunner`]: one worker pool per test class
//! - [`ParameterizedRunner`]: one worker pool shared by every parameter set
//! - [`crate::remote::RemoteClassRunner`]: dispatches each unit to a remote
//!   endpoint instead of a local pool

mod class;
mod inject;
mod notifier;
mod parameterized;
mod unit;

use thiserror::Error;

use crate::executor::{DrainReport, InterruptHandle, SchedulerError};
use crate::models::RunSummary;

pub use class::{ClassRunner, TestClass, TestMethod};
pub use inject::{FnInjector, Injector, NoInjection};
pub use notifier::RunNotifier;
pub use parameterized::{ParameterizedClass, ParameterizedRunner};
pub use unit::{expand, TestUnit, UnitId};

/// Runner errors; unit failures are reported, never raised
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// What a runner handed over and how its scheduler drained
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub scheduled: usize,
    pub ignored: usize,
    /// Present when this runner finished its scheduler
    pub drain: Option<DrainReport>,
}

impl RunOutcome {
    /// Units that should have produced a result
    pub fn expected(&self) -> usize {
        self.scheduled + self.ignored
    }
}

/// A runnable test suite
pub trait Runner {
    fn name(&self) -> &str;

    /// Qualified names of every unit, in declaration order
    fn children(&self) -> Vec<String>;

    /// Execute every unit; returns once all of them completed or were abandoned
    fn run(&self, notifier: &RunNotifier) -> Result<RunOutcome, RunnerError>;

    /// Signal that interrupts a draining run, if the runner uses a scheduler
    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        None
    }
}

/// Run a suite with a fresh notifier and summarize it
pub fn run_suite(runner: &dyn Runner, round: u32) -> Result<RunSummary, RunnerError> {
    let notifier = RunNotifier::new();
    let outcome = runner.run(&notifier)?;
    Ok(notifier.summary(runner.name(), round, outcome.expected()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_run_suite_summary() {
        let class = TestClass::<()>::with_default("Summary")
            .concurrent(2)
            .test(TestMethod::new("ok", |_| Ok(())).repeat(3))
            .test(TestMethod::new("skipped", |_| Ok(())).ignore());
        let runner = ClassRunner::new(class).unwrap();

        let summary = run_suite(&runner, 1).unwrap();
        assert_eq!(summary.suite, "Summary");
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.unreported, 0);
        assert!(summary.is_successful());
    }

    #[test]
    fn test_interrupted_run_leaves_units_unreported() {
        let class = TestClass::<()>::with_default("Abandoned")
            .concurrent(1)
            .test(
                TestMethod::new("slow", |_| {
                    thread::sleep(Duration::from_millis(200));
                    Ok(())
                })
                .repeat(5),
            );
        let runner = ClassRunner::new(class).unwrap();
        runner.interrupt_handle().unwrap().interrupt();

        let summary = run_suite(&runner, 1).unwrap();
        assert!(summary.unreported >= 4);
        assert_eq!(summary.failed, 0);
        assert!(!summary.is_successful());
    }
}
