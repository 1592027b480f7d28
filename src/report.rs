//! Averaged timing reports.
//!
//! A [`Report`] is a snapshot of an accumulator's running totals. It renders
//! as a column-aligned text table and serializes with serde for machine
//! consumption.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::Serialize;

const DEFAULT_TITLE: &str = "Average Iteration Times";
const DEFAULT_MIN_NAME_WIDTH: usize = 5;
const DEFAULT_MAX_NAME_WIDTH: usize = 60;
const DEFAULT_RULE_WIDTH: usize = 25;

/// Presentation settings for [`Report::render`].
///
/// Precision is not configurable: means are always printed in milliseconds
/// with three decimal places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    title: String,
    min_name_width: usize,
    max_name_width: usize,
    rule_width: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            min_name_width: DEFAULT_MIN_NAME_WIDTH,
            max_name_width: DEFAULT_MAX_NAME_WIDTH,
            rule_width: DEFAULT_RULE_WIDTH,
        }
    }
}

impl ReportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text shown between the rules of the header line.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Bounds for the name column. Names longer than `max` are printed in
    /// full and lose alignment. A `max` below `min` is raised to `min`.
    pub fn with_name_width(mut self, min: usize, max: usize) -> Self {
        self.min_name_width = min;
        self.max_name_width = max.max(min);
        self
    }

    /// Number of `=` on each side of the title.
    pub fn with_rule_width(mut self, width: usize) -> Self {
        self.rule_width = width;
        self
    }
}

/// Accumulated statistics for one phase name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    pub name: String,
    /// Number of committed chunks with this name.
    pub occurrences: u64,
    pub total: Duration,
    pub mean: Duration,
}

impl PhaseSummary {
    pub(crate) fn new(name: impl Into<String>, total: Duration, occurrences: u64) -> Self {
        Self {
            name: name.into(),
            occurrences,
            total,
            mean: mean_of(total, occurrences),
        }
    }

    /// Mean duration in (fractional) milliseconds.
    pub fn mean_ms(&self) -> f64 {
        self.mean.as_nanos() as f64 / 1_000_000.0
    }
}

/// `total / occurrences`, truncated to whole nanoseconds. Zero occurrences
/// yields zero.
pub(crate) fn mean_of(total: Duration, occurrences: u64) -> Duration {
    if occurrences == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(occurrences);
    let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
    // Always below one billion, so it fits.
    let subsec = (nanos % 1_000_000_000) as u32;
    Duration::new(secs, subsec)
}

/// Snapshot of per-phase averages, in first-seen phase order.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use iteration_timer::{IterationAccumulator, ManualClock};
///
/// let clock = ManualClock::new();
/// let mut timer = IterationAccumulator::with_clock(clock.clone());
/// timer.open_timepoint("parse");
/// clock.advance(Duration::from_micros(12_340));
/// timer.close_timepoint().unwrap();
/// timer.commit_iteration().unwrap();
///
/// let report = timer.report();
/// assert!(report.to_string().ends_with("parse--> 12.340 ms"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    iteration_count: u64,
    phases: Vec<PhaseSummary>,
}

impl Report {
    pub(crate) fn new(iteration_count: u64, phases: Vec<PhaseSummary>) -> Self {
        Self {
            iteration_count,
            phases,
        }
    }

    /// Number of iterations committed when the snapshot was taken.
    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    pub fn phases(&self) -> &[PhaseSummary] {
        &self.phases
    }

    pub fn get(&self, name: &str) -> Option<&PhaseSummary> {
        self.phases.iter().find(|p| p.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Render the header and one aligned line per phase.
    ///
    /// The name column is padded with `-` to the longest name (bounded by the
    /// config), and the means are right-aligned so their decimal points line
    /// up.
    pub fn render(&self, config: &ReportConfig) -> String {
        let rule = "=".repeat(config.rule_width);
        let mut lines = Vec::with_capacity(self.phases.len() + 1);
        lines.push(format!("{rule} {} {rule}", config.title));

        let name_width = self
            .phases
            .iter()
            .map(|p| p.name.chars().count())
            .max()
            .unwrap_or(0)
            .max(config.min_name_width)
            .min(config.max_name_width);

        let means: Vec<String> = self
            .phases
            .iter()
            .map(|p| format!("{:.3}", p.mean_ms()))
            .collect();
        let value_width = means.iter().map(String::len).max().unwrap_or(0);

        for (phase, mean) in self.phases.iter().zip(&means) {
            lines.push(format!(
                "{:-<name_width$}--> {:>value_width$} ms",
                phase.name, mean
            ));
        }

        lines.join("\n")
    }

    /// Print the rendered report with the default layout.
    pub fn print_to_stdout(&self) {
        println!("{self}");
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.render(&ReportConfig::default()))
    }
}
