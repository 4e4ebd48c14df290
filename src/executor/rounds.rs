//! Multi-round execution
//!
//! Runs a suite repeatedly with a fresh runner per round and aggregates the
//! per-unit outcomes so races that only show up occasionally become visible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{info, warn};

use super::InterruptHandle;
use crate::models::{RunSummary, UnitStatus};
use crate::runner::{run_suite, Runner, RunnerError};

/// Stops a multi-round run: interrupts the current round and skips the rest
#[derive(Clone, Default)]
pub struct RoundStop {
    stopped: Arc<AtomicBool>,
    current: Arc<Mutex<Option<InterruptHandle>>>,
}

impl RoundStop {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Ok(current) = self.current.lock() {
            if let Some(handle) = current.as_ref() {
                handle.interrupt();
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn arm(&self, handle: Option<InterruptHandle>) {
        if let Ok(mut current) = self.current.lock() {
            *current = handle;
        }
    }
}

/// Runs the same suite for a number of rounds
pub struct RoundRunner {
    rounds: u32,
    stop: RoundStop,
}

impl RoundRunner {
    pub fn new(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
            stop: RoundStop::default(),
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn stop_handle(&self) -> RoundStop {
        self.stop.clone()
    }

    /// Build a runner for each round with `factory` and run it
    pub fn run<F>(&self, factory: F) -> Result<Vec<RunSummary>, RunnerError>
    where
        F: Fn(u32) -> Result<Box<dyn Runner>, RunnerError>,
    {
        let mut summaries = Vec::new();

        for round in 1..=self.rounds {
            if self.stop.is_stopped() {
                warn!("Stopped before round {}/{}", round, self.rounds);
                break;
            }

            let runner = factory(round)?;
            info!("=== Round {}/{}: {} ===", round, self.rounds, runner.name());

            self.stop.arm(runner.interrupt_handle());
            // A stop raised between the check above and arming still lands
            if self.stop.is_stopped() {
                if let Some(handle) = runner.interrupt_handle() {
                    handle.interrupt();
                }
            }

            let start = Instant::now();
            let summary = run_suite(runner.as_ref(), round);
            self.stop.arm(None);
            let summary = summary?;

            info!(
                "Round {} completed in {}ms: {}/{} passed ({:.1}%)",
                round,
                start.elapsed().as_millis(),
                summary.passed,
                summary.total,
                summary.pass_rate()
            );

            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Aggregate results across multiple rounds
    pub fn aggregate_results(summaries: &[RunSummary]) -> AggregateResult {
        let total_rounds = summaries.len() as u32;
        let mut unit_stats: HashMap<String, UnitStats> = HashMap::new();

        for summary in summaries {
            for result in &summary.results {
                let stats = unit_stats.entry(result.qualified_name()).or_default();

                match result.status {
                    UnitStatus::Pass => stats.passes += 1,
                    UnitStatus::Fail => stats.failures += 1,
                    UnitStatus::Skip => stats.skips += 1,
                    UnitStatus::Error => stats.errors += 1,
                }
                stats.total_duration_ms += result.duration_ms;
            }
        }

        let unit_pass_rates = unit_stats
            .iter()
            .map(|(name, stats)| (name.clone(), stats.pass_rate()))
            .collect();

        let overall_pass_rate = if summaries.is_empty() {
            0.0
        } else {
            summaries.iter().map(|s| s.pass_rate()).sum::<f64>() / summaries.len() as f64
        };

        let rounds_with_failures = summaries
            .iter()
            .filter(|s| !s.is_successful())
            .map(|s| s.round)
            .collect();

        AggregateResult {
            total_rounds,
            unit_stats,
            unit_pass_rates,
            overall_pass_rate,
            rounds_with_failures,
        }
    }
}

/// Statistics for a single unit across rounds
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub passes: u32,
    pub failures: u32,
    pub skips: u32,
    pub errors: u32,
    pub total_duration_ms: u64,
}

impl UnitStats {
    fn executed(&self) -> u32 {
        self.passes + self.failures + self.errors
    }

    pub fn avg_duration_ms(&self) -> u64 {
        match self.executed() {
            0 => 0,
            n => self.total_duration_ms / n as u64,
        }
    }

    /// Percentage of executed (not skipped) runs that passed
    pub fn pass_rate(&self) -> f64 {
        match self.executed() {
            0 => 0.0,
            n => (self.passes as f64 / n as f64) * 100.0,
        }
    }
}

/// Aggregate results across multiple rounds
#[derive(Clone, Debug)]
pub struct AggregateResult {
    pub total_rounds: u32,
    pub unit_stats: HashMap<String, UnitStats>,
    pub unit_pass_rates: HashMap<String, f64>,
    pub overall_pass_rate: f64,
    pub rounds_with_failures: Vec<u32>,
}

impl AggregateResult {
    /// Units that passed in some rounds and failed in others, lowest pass rate first
    pub fn flaky_units(&self) -> Vec<(String, f64)> {
        let mut units: Vec<_> = self
            .unit_pass_rates
            .iter()
            .filter(|(_, rate)| **rate > 0.0 && **rate < 100.0)
            .map(|(name, rate)| (name.clone(), *rate))
            .collect();
        units.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        units
    }

    /// Units that passed every time they ran
    pub fn stable_units(&self) -> Vec<String> {
        let mut units: Vec<_> = self
            .unit_pass_rates
            .iter()
            .filter(|(_, rate)| **rate >= 100.0)
            .map(|(name, _)| name.clone())
            .collect();
        units.sort();
        units
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UnitResult;
    use crate::runner::{ClassRunner, TestClass, TestMethod};
    use chrono::Utc;
    use std::sync::atomic::AtomicU32;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_aggregate_results() {
        let round1 = vec![
            UnitResult::pass("Routing", "host", 100),
            UnitResult::fail("Routing", "path", 50, "failed"),
        ];
        let round2 = vec![
            UnitResult::pass("Routing", "host", 120),
            UnitResult::pass("Routing", "path", 60),
        ];
        let summaries = vec![
            RunSummary::new("Routing", 1, Utc::now(), round1),
            RunSummary::new("Routing", 2, Utc::now(), round2),
        ];

        let aggregate = RoundRunner::aggregate_results(&summaries);
        assert_eq!(aggregate.total_rounds, 2);
        assert_eq!(aggregate.unit_pass_rates.get("Routing.host"), Some(&100.0));
        assert_eq!(aggregate.unit_pass_rates.get("Routing.path"), Some(&50.0));
        assert_eq!(aggregate.unit_stats["Routing.host"].avg_duration_ms(), 110);
        assert_eq!(aggregate.rounds_with_failures, vec![1]);
        assert_eq!(aggregate.flaky_units(), vec![("Routing.path".to_string(), 50.0)]);
        assert_eq!(aggregate.stable_units(), vec!["Routing.host".to_string()]);
        assert!((aggregate.overall_pass_rate - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_empty() {
        let aggregate = RoundRunner::aggregate_results(&[]);
        assert_eq!(aggregate.total_rounds, 0);
        assert_eq!(aggregate.overall_pass_rate, 0.0);
        assert!(aggregate.flaky_units().is_empty());
    }

    #[test]
    fn test_skips_do_not_count_against_pass_rate() {
        let stats = UnitStats {
            passes: 2,
            skips: 3,
            total_duration_ms: 40,
            ..Default::default()
        };
        assert_eq!(stats.pass_rate(), 100.0);
        assert_eq!(stats.avg_duration_ms(), 20);
    }

    #[test]
    fn test_runs_every_round_with_fresh_runner() {
        let built = Arc::new(AtomicU32::new(0));
        let counter = built.clone();

        let summaries = RoundRunner::new(3)
            .run(move |_round| {
                counter.fetch_add(1, Ordering::SeqCst);
                let class = TestClass::<()>::with_default("Rounds")
                    .concurrent(2)
                    .test(TestMethod::new("ok", |_| Ok(())).repeat(2));
                Ok(Box::new(ClassRunner::new(class)?) as Box<dyn Runner>)
            })
            .unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 3);
        assert_eq!(summaries.len(), 3);
        assert_eq!(
            summaries.iter().map(|s| s.round).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(summaries.iter().all(|s| s.passed == 2));
    }

    #[test]
    fn test_zero_rounds_runs_once() {
        assert_eq!(RoundRunner::new(0).rounds(), 1);
    }

    #[test]
    fn test_stop_skips_remaining_rounds() {
        let runner = RoundRunner::new(5);
        let stop = runner.stop_handle();

        let summaries = runner
            .run(move |round| {
                if round == 2 {
                    stop.stop();
                }
                let class = TestClass::<()>::with_default("Stoppable")
                    .concurrent(1)
                    .test(
                        TestMethod::new("slow", |_| {
                            thread::sleep(Duration::from_millis(20));
                            Ok(())
                        })
                        .repeat(3),
                    );
                Ok(Box::new(ClassRunner::new(class)?) as Box<dyn Runner>)
            })
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert!(summaries[0].is_successful());
        assert!(summaries[1].unreported > 0);
    }
}
