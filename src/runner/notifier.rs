//! Per-unit result reporting
//!
//! Units report through the notifier from whichever worker thread runs them;
//! the scheduler never sees results.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::{RunSummary, UnitResult, UnitStatus};

/// Thread-safe collector of unit results
#[derive(Clone, Debug)]
pub struct RunNotifier {
    started_at: DateTime<Utc>,
    results: Arc<Mutex<Vec<UnitResult>>>,
}

impl RunNotifier {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fire_started(&self, class: &str, name: &str) {
        debug!("Started {}.{}", class, name);
    }

    pub fn fire_finished(&self, result: UnitResult) {
        match result.status {
            UnitStatus::Pass | UnitStatus::Skip => debug!("  {}", result),
            UnitStatus::Fail | UnitStatus::Error => info!("  {}", result),
        }
        self.lock().push(result);
    }

    pub fn fire_ignored(&self, class: &str, name: &str) {
        self.fire_finished(UnitResult::skip(class, name, "Ignored"));
    }

    /// Results reported so far, in completion order
    pub fn results(&self) -> Vec<UnitResult> {
        self.lock().clone()
    }

    pub fn reported(&self) -> usize {
        self.lock().len()
    }

    /// Summarize the run; units expected but never reported count as unreported
    pub fn summary(&self, suite: &str, round: u32, expected: usize) -> RunSummary {
        let results = self.results();
        let unreported = expected.saturating_sub(results.len());
        let summary = RunSummary::new(suite, round, self.started_at, results)
            .with_unreported(unreported);

        info!(
            "{} round {} completed - Pass: {}/{} ({:.1}%)",
            suite,
            round,
            summary.passed,
            summary.total,
            summary.pass_rate()
        );
        summary
    }

    fn lock(&self) -> MutexGuard<'_, Vec<UnitResult>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RunNotifier {
    fn default() -> Self {
        Self::new()
    }
}
