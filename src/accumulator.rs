//! Per-phase accumulation across iterations.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::chunk::TimeChunk;
use crate::clock::{Clock, SystemClock};
use crate::error::TimerError;
use crate::metrics::{
    DiscardScope, DiscardStats, IterationSink, IterationStats, NoOpSink, PhaseSample,
};
use crate::report::{PhaseSummary, Report, mean_of};

/// Running total for one phase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseTotal {
    pub total: Duration,
    pub occurrences: u64,
}

impl PhaseTotal {
    pub fn mean(&self) -> Duration {
        mean_of(self.total, self.occurrences)
    }
}

/// Accumulates named phase timings over many iterations.
///
/// Mark the boundaries of each phase with [`open_timepoint`], which also
/// closes the phase before it, close the final phase with
/// [`close_timepoint`], then either [`commit_iteration`] to fold the phases
/// into the running totals or [`discard_iteration`] to throw them away.
///
/// The accumulator has no internal locking. Own one per thread, or wrap it
/// in a lock.
///
/// # Example
///
/// ```rust
/// use iteration_timer::IterationAccumulator;
///
/// let mut timer = IterationAccumulator::new();
/// for _ in 0..3 {
///     timer.open_timepoint("parse");
///     timer.open_timepoint("execute");
///     timer.close_timepoint()?;
///     timer.commit_iteration()?;
/// }
/// assert_eq!(timer.iteration_count(), 3);
/// assert_eq!(timer.phase_names().collect::<Vec<_>>(), ["parse", "execute"]);
/// # Ok::<(), iteration_timer::TimerError>(())
/// ```
///
/// [`open_timepoint`]: Self::open_timepoint
/// [`close_timepoint`]: Self::close_timepoint
/// [`commit_iteration`]: Self::commit_iteration
/// [`discard_iteration`]: Self::discard_iteration
pub struct IterationAccumulator<C = SystemClock> {
    clock: C,
    current: Vec<TimeChunk>,
    totals: HashMap<String, PhaseTotal>,
    /// Keys of `totals` in first-commit order.
    order: Vec<String>,
    iteration_count: u64,
    sink: Arc<dyn IterationSink>,
}

impl IterationAccumulator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for IterationAccumulator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> IterationAccumulator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            current: Vec::new(),
            totals: HashMap::new(),
            order: Vec::new(),
            iteration_count: 0,
            sink: Arc::new(NoOpSink),
        }
    }

    /// Route commit and discard events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn IterationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Start a new phase named `name`, closing the previous phase first if it
    /// is still open.
    pub fn open_timepoint(&mut self, name: impl Into<String>) {
        let now = self.clock.now();

        if let Some(last) = self.current.last_mut().filter(|c| c.is_open()) {
            last.close(now);
            debug!(
                event = "Timepoint",
                phase = "Close",
                timepoint = last.name(),
                implicit = true
            );
        }

        let chunk = TimeChunk::open(name, now);
        debug!(event = "Timepoint", phase = "Open", timepoint = chunk.name());
        self.current.push(chunk);
    }

    /// Close the most recent phase now.
    pub fn close_timepoint(&mut self) -> Result<(), TimerError> {
        let now = self.clock.now();
        self.close_timepoint_at(now)
    }

    /// Close the most recent phase at `at`.
    ///
    /// Fails with [`TimerError::NoOpenTimepoint`] when the iteration is empty
    /// and [`TimerError::TimepointAlreadyClosed`] when the last phase was
    /// already closed.
    pub fn close_timepoint_at(&mut self, at: Instant) -> Result<(), TimerError> {
        let last = self
            .current
            .last_mut()
            .ok_or(TimerError::NoOpenTimepoint)?;
        if !last.is_open() {
            return Err(TimerError::TimepointAlreadyClosed(last.name().to_string()));
        }

        last.close(at);
        debug!(
            event = "Timepoint",
            phase = "Close",
            timepoint = last.name(),
            implicit = false
        );
        Ok(())
    }

    /// Fold every phase of the current iteration into the running totals.
    ///
    /// If any phase is still open this fails with
    /// [`TimerError::IncompleteTimepoint`] and leaves the iteration as it was,
    /// so the caller can close it and retry.
    pub fn commit_iteration(&mut self) -> Result<(), TimerError> {
        let mut phases = Vec::with_capacity(self.current.len());
        for chunk in &self.current {
            let elapsed = chunk
                .elapsed()
                .ok_or_else(|| TimerError::IncompleteTimepoint(chunk.name().to_string()))?;
            phases.push(PhaseSample {
                name: chunk.name().to_string(),
                elapsed,
            });
        }

        if phases.is_empty() {
            warn!(
                event = "Iteration",
                phase = "Commit",
                iteration = self.iteration_count + 1,
                "committing an iteration without any timepoints"
            );
        }

        for sample in &phases {
            match self.totals.get_mut(&sample.name) {
                Some(entry) => {
                    entry.total = entry.total.saturating_add(sample.elapsed);
                    entry.occurrences += 1;
                }
                None => {
                    self.order.push(sample.name.clone());
                    self.totals.insert(
                        sample.name.clone(),
                        PhaseTotal {
                            total: sample.elapsed,
                            occurrences: 1,
                        },
                    );
                }
            }
        }

        self.current.clear();
        self.iteration_count += 1;

        debug!(
            event = "Iteration",
            phase = "Commit",
            iteration = self.iteration_count,
            timepoints = phases.len()
        );
        self.sink.on_commit(&IterationStats {
            iteration: self.iteration_count,
            phases,
        });
        Ok(())
    }

    /// Throw away the current iteration. Totals are untouched.
    pub fn discard_iteration(&mut self) {
        let dropped: Vec<String> = self.current.drain(..).map(TimeChunk::into_name).collect();

        debug!(
            event = "Iteration",
            phase = "Discard",
            timepoints = dropped.len()
        );
        if !dropped.is_empty() {
            self.sink.on_discard(&DiscardStats {
                scope: DiscardScope::Iteration,
                dropped,
            });
        }
    }

    /// Remove the most recent phase, open or closed, and return it.
    pub fn discard_last_timepoint(&mut self) -> Result<TimeChunk, TimerError> {
        let chunk = self.current.pop().ok_or(TimerError::NoOpenTimepoint)?;

        debug!(
            event = "Timepoint",
            phase = "Discard",
            timepoint = chunk.name(),
            state = %chunk.state()
        );
        self.sink.on_discard(&DiscardStats {
            scope: DiscardScope::Timepoint,
            dropped: vec![chunk.name().to_string()],
        });
        Ok(chunk)
    }

    /// Phases of the iteration in progress.
    pub fn current(&self) -> &[TimeChunk] {
        &self.current
    }

    pub fn iteration_count(&self) -> u64 {
        self.iteration_count
    }

    /// Committed phase names in the order they were first seen.
    pub fn phase_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn total(&self, name: &str) -> Option<PhaseTotal> {
        self.totals.get(name).copied()
    }

    pub fn mean(&self, name: &str) -> Option<Duration> {
        self.totals.get(name).map(PhaseTotal::mean)
    }

    /// Snapshot the running averages. Never fails; with nothing committed the
    /// report has no rows.
    pub fn report(&self) -> Report {
        let phases = self
            .order
            .iter()
            .filter_map(|name| {
                self.totals
                    .get(name)
                    .map(|t| PhaseSummary::new(name.as_str(), t.total, t.occurrences))
            })
            .collect();
        Report::new(self.iteration_count, phases)
    }

    pub fn print_report(&self) {
        self.report().print_to_stdout();
    }
}

impl<C: Debug> Debug for IterationAccumulator<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("IterationAccumulator")
            .field("clock", &self.clock)
            .field("current", &self.current)
            .field("order", &self.order)
            .field("iteration_count", &self.iteration_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Mutex;
    use yare::parameterized;

    fn timer() -> (ManualClock, IterationAccumulator<ManualClock>) {
        let clock = ManualClock::new();
        (clock.clone(), IterationAccumulator::with_clock(clock))
    }

    #[derive(Default)]
    struct RecordingSink {
        commits: Mutex<Vec<IterationStats>>,
        discards: Mutex<Vec<DiscardStats>>,
    }

    impl IterationSink for RecordingSink {
        fn on_commit(&self, stats: &IterationStats) {
            self.commits.lock().unwrap().push(stats.clone());
        }

        fn on_discard(&self, stats: &DiscardStats) {
            self.discards.lock().unwrap().push(stats.clone());
        }
    }

    #[test]
    fn test_open_closes_previous() {
        let (clock, mut timer) = timer();
        timer.open_timepoint("a");
        clock.advance(Duration::from_millis(4));
        timer.open_timepoint("b");

        let current = timer.current();
        assert_eq!(current.len(), 2);
        assert_eq!(current[0].elapsed(), Some(Duration::from_millis(4)));
        assert!(current[1].is_open());
        assert_eq!(current[1].begin(), current[0].end().unwrap());
    }

    #[test]
    fn test_open_after_closed_does_not_reclose() {
        let (clock, mut timer) = timer();
        timer.open_timepoint("a");
        clock.advance(Duration::from_millis(1));
        timer.close_timepoint().unwrap();
        clock.advance(Duration::from_millis(5));
        timer.open_timepoint("b");

        assert_eq!(timer.current()[0].elapsed(), Some(Duration::from_millis(1)));
    }

    #[test]
    fn test_close_on_empty_iteration() {
        let (_, mut timer) = timer();
        assert_eq!(timer.close_timepoint(), Err(TimerError::NoOpenTimepoint));
    }

    #[test]
    fn test_close_at_explicit_instant() {
        let (clock, mut timer) = timer();
        timer.open_timepoint("a");
        let at = clock.now() + Duration::from_millis(9);
        timer.close_timepoint_at(at).unwrap();
        timer.commit_iteration().unwrap();
        assert_eq!(timer.mean("a"), Some(Duration::from_millis(9)));
    }

    #[test]
    fn test_commit_names_first_open_chunk() {
        let (_, mut timer) = timer();
        timer.open_timepoint("a");
        timer.open_timepoint("b");
        assert_eq!(
            timer.commit_iteration(),
            Err(TimerError::IncompleteTimepoint("b".to_string()))
        );
        assert_eq!(timer.current().len(), 2);
        assert_eq!(timer.iteration_count(), 0);
    }

    #[test]
    fn test_commit_empty_iteration_counts() {
        let (_, mut timer) = timer();
        timer.commit_iteration().unwrap();
        assert_eq!(timer.iteration_count(), 1);
        assert!(timer.report().is_empty());
    }

    #[test]
    fn test_discard_last_timepoint() {
        let (clock, mut timer) = timer();
        timer.open_timepoint("a");
        clock.advance(Duration::from_millis(2));
        timer.open_timepoint("bad");

        let dropped = timer.discard_last_timepoint().unwrap();
        assert_eq!(dropped.name(), "bad");
        assert!(dropped.is_open());

        // "a" was closed by opening "bad" and survives.
        timer.commit_iteration().unwrap();
        assert_eq!(timer.phase_names().collect::<Vec<_>>(), ["a"]);
        assert_eq!(timer.mean("a"), Some(Duration::from_millis(2)));
    }

    #[test]
    fn test_discard_last_timepoint_on_empty_iteration() {
        let (_, mut timer) = timer();
        assert_eq!(
            timer.discard_last_timepoint().unwrap_err(),
            TimerError::NoOpenTimepoint
        );
    }

    #[parameterized(
        one = { &[5], 5_000 },
        equal = { &[10, 10, 10], 10_000 },
        varying = { &[10, 20, 60], 30_000 },
        fractional = { &[1, 2], 1_500 },
    )]
    fn test_mean_across_iterations(durations_ms: &[u64], expected_us: u64) {
        let (clock, mut timer) = timer();
        for ms in durations_ms {
            timer.open_timepoint("phase");
            clock.advance(Duration::from_millis(*ms));
            timer.close_timepoint().unwrap();
            timer.commit_iteration().unwrap();
        }

        let total = timer.total("phase").unwrap();
        assert_eq!(total.occurrences, durations_ms.len() as u64);
        assert_eq!(total.total, Duration::from_millis(durations_ms.iter().sum()));
        assert_eq!(timer.mean("phase"), Some(Duration::from_micros(expected_us)));
    }

    #[test]
    fn test_sink_sees_commits_and_discards() {
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::new();
        let mut timer = IterationAccumulator::with_clock(clock.clone()).with_sink(sink.clone());

        timer.open_timepoint("load");
        clock.advance(Duration::from_millis(10));
        timer.open_timepoint("process");
        clock.advance(Duration::from_millis(20));
        timer.close_timepoint().unwrap();
        timer.commit_iteration().unwrap();

        timer.open_timepoint("load");
        timer.open_timepoint("oops");
        timer.discard_last_timepoint().unwrap();
        timer.discard_iteration();
        // Nothing left to drop; no event.
        timer.discard_iteration();

        let commits = sink.commits.lock().unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].iteration, 1);
        assert_eq!(commits[0].total(), Duration::from_millis(30));
        assert_eq!(commits[0].phases[1].name, "process");

        let discards = sink.discards.lock().unwrap();
        assert_eq!(discards.len(), 2);
        assert_eq!(discards[0].scope, DiscardScope::Timepoint);
        assert_eq!(discards[0].dropped, ["oops"]);
        assert_eq!(discards[1].scope, DiscardScope::Iteration);
        assert_eq!(discards[1].dropped, ["load"]);
    }

    #[test]
    fn test_debug_output() {
        let (_, mut timer) = timer();
        timer.open_timepoint("a");
        let debug_str = format!("{timer:?}");
        assert!(debug_str.contains("IterationAccumulator"));
        assert!(debug_str.contains("iteration_count: 0"));
    }
}
