//! Data models for test execution
//!
//! Directives that shape scheduling and the results units report.

mod directive;
mod test_result;

pub use directive::{ClassConfig, Concurrent, DirectiveError, Repeat};
pub use test_result::{RunSummary, UnitResult, UnitStatus};
