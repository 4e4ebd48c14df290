//! Result formatters
//!
//! Table, JSON, CSV and one-line summary renderings of unit results, run
//! summaries and multi-round aggregates.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::executor::AggregateResult;
use crate::models::{RunSummary, UnitResult, UnitStatus};

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    JsonPretty,
    Csv,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "table" => Some(OutputFormat::Table),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::JsonPretty => "json-pretty",
            OutputFormat::Csv => "csv",
            OutputFormat::Summary => "summary",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result formatter
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.colorize {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn rate_color(rate: f64) -> &'static str {
        if rate >= 90.0 {
            GREEN
        } else if rate >= 50.0 {
            YELLOW
        } else {
            RED
        }
    }

    fn to_json<S: Serialize>(&self, value: &S) -> String {
        let rendered = if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_default()
    }

    /// Format a single unit result
    pub fn format_result(&self, result: &UnitResult) -> String {
        match self.format {
            OutputFormat::Table => self.format_result_table(result),
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(result),
            OutputFormat::Csv => Self::format_result_csv(result),
            OutputFormat::Summary => format!(
                "{} {} ({}ms)",
                result.status.symbol(),
                result.qualified_name(),
                result.duration_ms
            ),
        }
    }

    fn format_result_table(&self, result: &UnitResult) -> String {
        let status = match result.status {
            UnitStatus::Pass => self.paint(GREEN, "✓ PASS"),
            UnitStatus::Fail => self.paint(RED, "✗ FAIL"),
            UnitStatus::Skip => self.paint(YELLOW, "○ SKIP"),
            UnitStatus::Error => self.paint(RED, "! ERROR"),
        };

        let mut line = format!(
            "{:40} {} [{:>6}ms] {}",
            result.qualified_name(),
            status,
            result.duration_ms,
            result.thread.as_deref().unwrap_or("-")
        );
        if let Some(message) = &result.message {
            line.push_str(&format!("\n      {message}"));
        }
        line
    }

    fn format_result_csv(result: &UnitResult) -> String {
        format!(
            "{},{},{},{},{},\"{}\"",
            result.class,
            result.name,
            result.status,
            result.duration_ms,
            result.thread.as_deref().unwrap_or(""),
            result.message.as_deref().unwrap_or("").replace('"', "\"\"")
        )
    }

    /// Format one run summary
    pub fn format_summary(&self, summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Table => self.format_summary_table(summary),
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(summary),
            OutputFormat::Csv => self.format_summary_csv(summary),
            OutputFormat::Summary => Self::format_summary_brief(summary),
        }
    }

    fn format_summary_table(&self, summary: &RunSummary) -> String {
        let rule = "═".repeat(72);
        let mut output = String::new();

        output.push_str(&format!("\n{rule}\n"));
        output.push_str(&format!(
            " Round {:3} - {} ({})\n",
            summary.round,
            summary.suite,
            summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push_str(&format!("{rule}\n"));

        for result in &summary.results {
            output.push_str(&format!(" {}\n", self.format_result_table(result)));
        }

        output.push_str(&format!("{}\n", "─".repeat(72)));

        let passed = self.paint(GREEN, &summary.passed.to_string());
        let failed = if summary.failed > 0 {
            self.paint(RED, &summary.failed.to_string())
        } else {
            summary.failed.to_string()
        };
        output.push_str(&format!(
            " Total: {} | Pass: {} | Fail: {} | Skip: {} | Error: {}",
            summary.total, passed, failed, summary.skipped, summary.errors
        ));
        if summary.unreported > 0 {
            output.push_str(&format!(
                " | {}",
                self.paint(YELLOW, &format!("Unreported: {}", summary.unreported))
            ));
        }
        output.push('\n');
        output.push_str(&format!(
            " Pass Rate: {:5.1}% | Duration: {}ms\n",
            summary.pass_rate(),
            summary.total_duration_ms
        ));

        output
    }

    fn format_summary_csv(&self, summary: &RunSummary) -> String {
        let mut output = String::from("class,name,status,duration_ms,thread,message\n");
        for result in &summary.results {
            output.push_str(&Self::format_result_csv(result));
            output.push('\n');
        }
        output
    }

    fn format_summary_brief(summary: &RunSummary) -> String {
        let mut line = format!(
            "{} - Round {}: {}/{} passed ({:.1}%) in {}ms",
            summary.suite,
            summary.round,
            summary.passed,
            summary.total,
            summary.pass_rate(),
            summary.total_duration_ms
        );
        if summary.unreported > 0 {
            line.push_str(&format!(", {} unreported", summary.unreported));
        }
        line
    }

    /// Format every round of a run
    pub fn format_rounds(&self, summaries: &[RunSummary]) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.to_json(&summaries),
            OutputFormat::Csv => {
                let mut output = String::from("round,class,name,status,duration_ms,thread,message\n");
                for summary in summaries {
                    for result in &summary.results {
                        output.push_str(&format!(
                            "{},{}\n",
                            summary.round,
                            Self::format_result_csv(result)
                        ));
                    }
                }
                output
            }
            OutputFormat::Table | OutputFormat::Summary => summaries
                .iter()
                .map(|s| self.format_summary(s))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Format aggregate results across rounds
    pub fn format_aggregate(&self, aggregate: &AggregateResult, suite: &str) -> String {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                #[derive(Serialize)]
                struct AggregateJson<'a> {
                    suite: &'a str,
                    total_rounds: u32,
                    overall_pass_rate: f64,
                    rounds_with_failures: &'a [u32],
                    unit_pass_rates: BTreeMap<&'a str, f64>,
                }

                self.to_json(&AggregateJson {
                    suite,
                    total_rounds: aggregate.total_rounds,
                    overall_pass_rate: aggregate.overall_pass_rate,
                    rounds_with_failures: &aggregate.rounds_with_failures,
                    unit_pass_rates: aggregate
                        .unit_pass_rates
                        .iter()
                        .map(|(k, v)| (k.as_str(), *v))
                        .collect(),
                })
            }
            OutputFormat::Summary => format!(
                "{}: {} rounds, {:.1}% overall, {} flaky unit(s)",
                suite,
                aggregate.total_rounds,
                aggregate.overall_pass_rate,
                aggregate.flaky_units().len()
            ),
            OutputFormat::Table | OutputFormat::Csv => self.format_aggregate_table(aggregate, suite),
        }
    }

    fn format_aggregate_table(&self, aggregate: &AggregateResult, suite: &str) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", "═".repeat(72)));
        output.push_str(&format!(
            " Aggregate Results: {} ({} rounds)\n",
            suite, aggregate.total_rounds
        ));
        output.push_str(&format!("{}\n", "═".repeat(72)));
        output.push_str(&format!(
            " Overall Pass Rate: {:.1}%\n\n",
            aggregate.overall_pass_rate
        ));

        let mut units: Vec<_> = aggregate.unit_pass_rates.iter().collect();
        units.sort_by(|a, b| a.0.cmp(b.0));

        for (name, rate) in units {
            let filled = ((*rate / 5.0) as usize).min(20);
            let bar = format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled));
            let rate_str = self.paint(Self::rate_color(*rate), &format!("{rate:5.1}%"));
            output.push_str(&format!(" {:40} {} {}\n", name, bar, rate_str));
        }

        let flaky = aggregate.flaky_units();
        if !flaky.is_empty() {
            output.push_str("\n Flaky units (passed in some rounds only):\n");
            for (name, rate) in flaky.iter().take(10) {
                output.push_str(&format!("   - {} ({:.1}%)\n", name, rate));
            }
        }
        if !aggregate.rounds_with_failures.is_empty() {
            output.push_str(&format!(
                "\n Rounds with failures: {:?}\n",
                aggregate.rounds_with_failures
            ));
        }

        output
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Table)
    }
}

/// Write every round to a file, uncolored
pub fn write_results_to_file(
    path: impl AsRef<Path>,
    summaries: &[RunSummary],
    format: OutputFormat,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let content = ResultFormatter::new(format).no_color().format_rounds(summaries);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    Ok(())
}
