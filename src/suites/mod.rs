//! Built-in demonstration suites
//!
//! ## Suites
//!
//! - `multithreaded`: ten independent sleeping methods, class defaults
//! - `repeated`: class repeat 2, one method overriding it with repeat 3, 10 threads
//! - `missing-sync`: an unsynchronized counter that only stays correct on one thread
//! - `parameterized`: four parameter sets × two methods on one 8-thread pool

mod missing_sync;
mod multithreaded;
mod parameterized;
mod repeated;

use std::fmt;
use std::time::Duration;

use crate::runner::{Runner, RunnerError};

pub use missing_sync::{missing_sync, RacyCounter};
pub use multithreaded::multithreaded;
pub use parameterized::parameterized;
pub use repeated::repeated;

/// Iterations of the sleep loop inside each demo method
pub(crate) const MAX_LOOP: u32 = 5;

/// Knobs shared by every built-in suite
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuiteOptions {
    /// Overrides the suite's own concurrency directive
    pub threads: Option<u32>,
    /// Sleep per loop iteration in the demo methods
    pub step: Duration,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            threads: None,
            step: Duration::from_millis(500),
        }
    }
}

impl SuiteOptions {
    pub fn with_threads(mut self, threads: Option<u32>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    pub(crate) fn threads_or(&self, default: u32) -> u32 {
        self.threads.unwrap_or(default)
    }
}

/// Built-in suites
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Suite {
    Multithreaded,
    Repeated,
    MissingSync,
    Parameterized,
}

impl Suite {
    pub fn all() -> Vec<Suite> {
        vec![
            Suite::Multithreaded,
            Suite::Repeated,
            Suite::MissingSync,
            Suite::Parameterized,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Suite::Multithreaded => "multithreaded",
            Suite::Repeated => "repeated",
            Suite::MissingSync => "missing-sync",
            Suite::Parameterized => "parameterized",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Suite::Multithreaded => "Ten sleeping methods on the class's worker pool",
            Suite::Repeated => "Class-level repeat 2 with a method-level repeat 3 override",
            Suite::MissingSync => "Unsynchronized counter; fails with more than one thread",
            Suite::Parameterized => "Four parameter sets sharing one 8-thread pool",
        }
    }

    pub fn from_str(s: &str) -> Option<Suite> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "multithreaded" => Some(Suite::Multithreaded),
            "repeated" => Some(Suite::Repeated),
            "missing-sync" | "missingsync" => Some(Suite::MissingSync),
            "parameterized" => Some(Suite::Parameterized),
            _ => None,
        }
    }

    /// Build a fresh runner for one execution of the suite
    pub fn build(&self, options: &SuiteOptions) -> Result<Box<dyn Runner>, RunnerError> {
        match self {
            Suite::Multithreaded => multithreaded(options),
            Suite::Repeated => repeated(options),
            Suite::MissingSync => missing_sync(options),
            Suite::Parameterized => parameterized(options),
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_names_parse() {
        for suite in Suite::all() {
            assert_eq!(Suite::from_str(suite.name()), Some(suite));
        }
        assert_eq!(Suite::from_str("MISSING_SYNC"), Some(Suite::MissingSync));
        assert_eq!(Suite::from_str("unknown"), None);
    }

    #[test]
    fn test_suite_unit_counts() {
        let options = SuiteOptions::default();
        let count = |suite: Suite| suite.build(&options).unwrap().children().len();

        assert_eq!(count(Suite::Multithreaded), 10);
        assert_eq!(count(Suite::Repeated), 5);
        assert_eq!(count(Suite::MissingSync), 10);
        assert_eq!(count(Suite::Parameterized), 8);
    }
}
