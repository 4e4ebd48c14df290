//! Concurrent and repeated test execution
//!
//! Test classes are described explicitly ([`runner::TestClass`]), expanded
//! into units by their repeat directives, and handed in declaration order to a
//! [`executor::ConcurrentScheduler`] backed by a named worker pool sized by the
//! class's concurrency directive. The scheduler's `finished` drain returns only
//! once every handed-over unit has completed, or after an interrupt has
//! cancelled the rest.
//!
//! ```no_run
//! use concurrent_runner::runner::{run_suite, ClassRunner, TestClass, TestMethod};
//!
//! let class = TestClass::<()>::with_default("Example")
//!     .concurrent(4)
//!     .test(TestMethod::new("works", |_| Ok(())).repeat(8));
//!
//! let runner = ClassRunner::new(class)?;
//! let summary = run_suite(&runner, 1)?;
//! assert!(summary.is_successful());
//! # Ok::<(), concurrent_runner::runner::RunnerError>(())
//! ```

pub mod config;
pub mod executor;
pub mod models;
pub mod output;
pub mod remote;
pub mod runner;
pub mod suites;
pub mod utils;
