//! Output formatting
//!
//! Renders unit results, run summaries and round aggregates.

mod formatter;

pub use formatter::{write_results_to_file, OutputFormat, ResultFormatter};
