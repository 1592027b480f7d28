//! Observer hooks for committed and discarded iterations.
//!
//! An [`IterationSink`] lets a consumer forward per-iteration timings to any
//! metrics backend (Prometheus, OpenTelemetry, a log file) without tying this
//! crate to one. Sinks are owned by the accumulator they observe; there is no
//! process-wide sink.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use iteration_timer::IterationAccumulator;
//! use iteration_timer::metrics::{IterationSink, IterationStats};
//!
//! #[derive(Default)]
//! struct CountingSink {
//!     commits: AtomicU64,
//! }
//!
//! impl IterationSink for CountingSink {
//!     fn on_commit(&self, _stats: &IterationStats) {
//!         self.commits.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//!
//! let sink = Arc::new(CountingSink::default());
//! let mut timer = IterationAccumulator::new().with_sink(sink.clone());
//! timer.open_timepoint("work");
//! timer.close_timepoint().unwrap();
//! timer.commit_iteration().unwrap();
//! assert_eq!(sink.commits.load(Ordering::Relaxed), 1);
//! ```

use serde::Serialize;
use std::time::Duration;

/// Elapsed time of one timechunk in a committed iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSample {
    pub name: String,
    pub elapsed: Duration,
}

/// Snapshot of a committed iteration, passed to [`IterationSink::on_commit`].
///
/// # Fields
///
/// * `iteration` - 1-based index of the iteration among committed ones.
/// * `phases` - Every chunk of the iteration, in the order it was opened.
///   Repeated names appear once per occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IterationStats {
    pub iteration: u64,
    pub phases: Vec<PhaseSample>,
}

impl IterationStats {
    /// Sum of all phase durations in the iteration.
    pub fn total(&self) -> Duration {
        self.phases.iter().map(|p| p.elapsed).sum()
    }
}

/// What a discard threw away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscardScope {
    Iteration,
    Timepoint,
}

/// Snapshot of a discard, passed to [`IterationSink::on_discard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscardStats {
    pub scope: DiscardScope,
    /// Names of the chunks that were dropped, in iteration order.
    pub dropped: Vec<String>,
}

/// Consumer of iteration events.
///
/// Called synchronously from the accumulator, in the caller's hot loop, so
/// implementations should return quickly.
pub trait IterationSink: Send + Sync {
    /// Called after an iteration has been folded into the running totals.
    fn on_commit(&self, stats: &IterationStats);

    /// Called after chunks were dropped by a discard. The default does nothing.
    fn on_discard(&self, _stats: &DiscardStats) {}
}

/// Sink used when none is installed.
pub(crate) struct NoOpSink;

impl IterationSink for NoOpSink {
    fn on_commit(&self, _stats: &IterationStats) {}
}
