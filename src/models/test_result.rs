//! Test result models
//!
//! Defines unit outcomes and per-run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Pass,
    Fail,
    Skip,
    Error,
}

impl UnitStatus {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnitStatus::Pass => "✓",
            UnitStatus::Fail => "✗",
            UnitStatus::Skip => "○",
            UnitStatus::Error => "!",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UnitStatus::Pass)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Pass => write!(f, "PASS"),
            UnitStatus::Fail => write!(f, "FAIL"),
            UnitStatus::Skip => write!(f, "SKIP"),
            UnitStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Result of one unit execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitResult {
    pub class: String,
    pub name: String,
    pub status: UnitStatus,
    pub duration_ms: u64,
    pub message: Option<String>,
    /// Worker thread that ran the unit, if it ran on a pool
    pub thread: Option<String>,
}

impl UnitResult {
    fn new(class: impl Into<String>, name: impl Into<String>, status: UnitStatus) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            status,
            duration_ms: 0,
            message: None,
            thread: None,
        }
    }

    pub fn pass(class: impl Into<String>, name: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            duration_ms,
            ..Self::new(class, name, UnitStatus::Pass)
        }
    }

    pub fn fail(
        class: impl Into<String>,
        name: impl Into<String>,
        duration_ms: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            duration_ms,
            message: Some(message.into()),
            ..Self::new(class, name, UnitStatus::Fail)
        }
    }

    pub fn skip(class: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            message: Some(reason.into()),
            ..Self::new(class, name, UnitStatus::Skip)
        }
    }

    pub fn error(
        class: impl Into<String>,
        name: impl Into<String>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            duration_ms,
            message: Some(error.into()),
            ..Self::new(class, name, UnitStatus::Error)
        }
    }

    pub fn on_thread(mut self, thread: Option<String>) -> Self {
        self.thread = thread;
        self
    }

    /// `Class.name` as shown in reports
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }
}

impl fmt::Display for UnitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}ms]",
            self.status.symbol(),
            self.qualified_name(),
            self.duration_ms
        )?;
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Summary of one runner execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub suite: String,
    pub round: u32,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Units handed to a scheduler that never reported (abandoned on interrupt)
    pub unreported: usize,
    pub total_duration_ms: u64,
    pub results: Vec<UnitResult>,
}

impl RunSummary {
    pub fn new(
        suite: impl Into<String>,
        round: u32,
        started_at: DateTime<Utc>,
        results: Vec<UnitResult>,
    ) -> Self {
        let count = |status: UnitStatus| results.iter().filter(|r| r.status == status).count();
        let total = results.len();
        let passed = count(UnitStatus::Pass);
        let failed = count(UnitStatus::Fail);
        let skipped = count(UnitStatus::Skip);
        let errors = count(UnitStatus::Error);
        let total_duration_ms = results.iter().map(|r| r.duration_ms).sum();

        Self {
            suite: suite.into(),
            round,
            started_at,
            total,
            passed,
            failed,
            skipped,
            errors,
            unreported: 0,
            total_duration_ms,
            results,
        }
    }

    pub fn with_unreported(mut self, unreported: usize) -> Self {
        self.unreported = unreported;
        self
    }

    pub fn pass_rate(&self) -> f64 {
        let executed = self.total - self.skipped;
        if executed == 0 {
            0.0
        } else {
            (self.passed as f64 / executed as f64) * 100.0
        }
    }

    /// True when nothing failed or errored and no unit went missing
    pub fn is_successful(&self) -> bool {
        self.failed == 0 && self.errors == 0 && self.unreported == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Round {} - {}", self.round, self.suite)?;
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        for result in &self.results {
            writeln!(f, "  {result}")?;
        }
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(
            f,
            "Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {} | Unreported: {}",
            self.total, self.passed, self.failed, self.skipped, self.errors, self.unreported
        )?;
        writeln!(
            f,
            "Pass Rate: {:.1}% | Duration: {}ms",
            self.pass_rate(),
            self.total_duration_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_creation() {
        let result = UnitResult::pass("RepeatedTest", "repeatedMethod[0]", 100);
        assert!(result.status.is_success());
        assert_eq!(result.duration_ms, 100);
        assert_eq!(result.qualified_name(), "RepeatedTest.repeatedMethod[0]");
    }

    #[test]
    fn test_run_summary() {
        let results = vec![
            UnitResult::pass("A", "one", 100),
            UnitResult::fail("A", "two", 50, "assertion failed"),
            UnitResult::skip("A", "three", "ignored"),
        ];

        let summary = RunSummary::new("A", 1, Utc::now(), results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.pass_rate(), 50.0);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_unreported_units_mark_run_unsuccessful() {
        let summary = RunSummary::new("A", 1, Utc::now(), vec![UnitResult::pass("A", "one", 1)])
            .with_unreported(2);
        assert_eq!(summary.passed, 1);
        assert!(!summary.is_successful());
        assert!(summary.to_string().contains("Unreported: 2"));
    }
}
